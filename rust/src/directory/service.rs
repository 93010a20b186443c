//! Request-scoped lookups: one gateway query, then projection.

use tracing::{debug, info};

use crate::directory::gateway::{DirectoryError, DirectoryGateway};
use crate::directory::ou::OuFilter;
use crate::directory::projector::{DirectoryUserProjector, DirectoryUserRecord, ProjectionMode};

pub struct DirectoryService<G> {
    gateway: G,
    projector: DirectoryUserProjector,
}

impl<G: DirectoryGateway> DirectoryService<G> {
    pub fn new(gateway: G, projector: DirectoryUserProjector) -> Self {
        Self { gateway, projector }
    }

    /// `Ok(None)` when no principal with a readable account name matches.
    pub fn lookup_user(&self, account_name: &str) -> Result<Option<DirectoryUserRecord>, DirectoryError> {
        let Some(entry) = self.gateway.find_user(account_name)? else {
            debug!(account_name, "user not found");
            return Ok(None);
        };
        Ok(self.projector.project(&entry, ProjectionMode::SingleUser))
    }

    /// `Ok(None)` when the unit has no users. Listed records never carry
    /// extended attributes.
    pub fn list_organizational_unit(
        &self,
        ou: &str,
    ) -> Result<Option<Vec<DirectoryUserRecord>>, DirectoryError> {
        let entries = OuFilter::new(ou).select(self.gateway.list_users()?);
        let records: Vec<DirectoryUserRecord> = entries
            .iter()
            .filter_map(|entry| self.projector.project(entry, ProjectionMode::Listing))
            .collect();
        info!(ou, count = records.len(), "listed organizational unit");
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(records))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::DirectoryService;
    use crate::directory::entry::fake::FakeEntry;
    use crate::directory::gateway::{DirectoryError, DirectoryGateway};
    use crate::directory::projector::DirectoryUserProjector;

    struct FakeGateway {
        users: Vec<FakeEntry>,
        fail: bool,
        calls: Cell<usize>,
    }

    impl FakeGateway {
        fn new(users: Vec<FakeEntry>) -> Self {
            Self {
                users,
                fail: false,
                calls: Cell::new(0),
            }
        }
    }

    impl DirectoryGateway for FakeGateway {
        type Entry = FakeEntry;

        fn find_user(&self, account_name: &str) -> Result<Option<FakeEntry>, DirectoryError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(DirectoryError::Search("server unavailable".into()));
            }
            Ok(self
                .users
                .iter()
                .find(|user| {
                    user.values
                        .get("sAMAccountName")
                        .and_then(|value| value.clone().ok())
                        .and_then(|value| value.into_text().ok())
                        .as_deref()
                        == Some(account_name)
                })
                .cloned())
        }

        fn list_users(&self) -> Result<Vec<FakeEntry>, DirectoryError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(DirectoryError::Search("server unavailable".into()));
            }
            Ok(self.users.clone())
        }
    }

    fn directory() -> Vec<FakeEntry> {
        vec![
            FakeEntry::new("CN=Jane,OU=Sales,DC=corp,DC=local")
                .text("sAMAccountName", "jane")
                .text("mail", "jane@corp.local")
                .text("displayName", "Jane Doe")
                .text("department", "Sales"),
            FakeEntry::new("CN=Raj,OU=Sales,DC=corp,DC=local")
                .text("sAMAccountName", "raj")
                .text("department", "Sales"),
            FakeEntry::new("CN=Mia,OU=Marketing,DC=corp,DC=local")
                .text("sAMAccountName", "mia"),
            FakeEntry::new("CN=Printer,OU=Sales,DC=corp,DC=local").text("description", "no account"),
        ]
    }

    fn service(users: Vec<FakeEntry>) -> DirectoryService<FakeGateway> {
        DirectoryService::new(FakeGateway::new(users), DirectoryUserProjector::default())
    }

    #[test]
    fn single_lookup_includes_extended_attributes() {
        let record = service(directory())
            .lookup_user("jane")
            .expect("lookup should succeed")
            .expect("jane exists");
        assert_eq!(record.email.as_deref(), Some("jane@corp.local"));
        assert_eq!(record.extended_attributes.get("department").map(String::as_str), Some("Sales"));
    }

    #[test]
    fn unknown_user_is_not_found() {
        assert!(service(directory())
            .lookup_user("nobody")
            .expect("lookup should succeed")
            .is_none());
    }

    #[test]
    fn ou_listing_filters_and_omits_extended_attributes() {
        let records = service(directory())
            .list_organizational_unit("Sales")
            .expect("listing should succeed")
            .expect("sales has users");
        let names: Vec<&str> = records.iter().map(|r| r.account_name.as_str()).collect();
        assert_eq!(names, vec!["jane", "raj"]);
        assert!(records.iter().all(|r| r.extended_attributes.is_empty()));
    }

    #[test]
    fn empty_unit_is_not_found() {
        assert!(service(directory())
            .list_organizational_unit("Finance")
            .expect("listing should succeed")
            .is_none());
    }

    #[test]
    fn upstream_failures_propagate_without_retry() {
        let mut gateway = FakeGateway::new(directory());
        gateway.fail = true;
        let service = DirectoryService::new(gateway, DirectoryUserProjector::default());
        assert!(matches!(service.lookup_user("jane"), Err(DirectoryError::Search(_))));
        assert!(service.list_organizational_unit("Sales").is_err());
        assert_eq!(service.gateway.calls.get(), 2);
    }
}
