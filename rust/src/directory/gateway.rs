//! Directory query gateway. The service only depends on [`DirectoryGateway`];
//! [`LdapGateway`] is the production implementation over `ldap3`.

use std::time::Duration;

use ldap3::{ldap_escape, LdapConn, LdapConnSettings, Scope, SearchEntry};
use thiserror::Error;
use tracing::{debug, info};

use crate::credentials::BindCredentials;
use crate::directory::entry::{DirectoryEntry, LdapEntry};
use crate::directory::projector::AttributeMap;

pub const DEFAULT_USER_FILTER: &str = "(&(objectCategory=person)(objectClass=user))";

/// Upstream directory failures. Messages never include bind passwords.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },
    #[error("directory bind as {principal} failed: {reason}")]
    Bind { principal: String, reason: String },
    #[error("directory search failed: {0}")]
    Search(String),
}

pub trait DirectoryGateway {
    type Entry: DirectoryEntry;

    /// Resolves one principal by account name; `Ok(None)` when it does not exist.
    fn find_user(&self, account_name: &str) -> Result<Option<Self::Entry>, DirectoryError>;

    /// Enumerates every user principal along with its distinguished name.
    fn list_users(&self) -> Result<Vec<Self::Entry>, DirectoryError>;
}

/// Where and how to reach the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySettings {
    pub domain: String,
    pub url: String,
    pub base_dn: String,
    pub user_filter: String,
    pub timeout: Duration,
    pub attributes: AttributeMap,
}

impl DirectorySettings {
    /// Settings for `domain` with the conventional URL and base DN.
    pub fn for_domain(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            url: default_url(domain),
            base_dn: base_dn_from_domain(domain),
            user_filter: DEFAULT_USER_FILTER.to_string(),
            timeout: Duration::from_secs(10),
            attributes: AttributeMap::default(),
        }
    }
}

pub fn default_url(domain: &str) -> String {
    format!("ldaps://{domain}")
}

/// `corp.local` becomes `DC=corp,DC=local`.
pub fn base_dn_from_domain(domain: &str) -> String {
    domain
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| format!("DC={part}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Opens a fresh bound connection per query, so concurrent requests never
/// share a session.
pub struct LdapGateway {
    settings: DirectorySettings,
    credentials: BindCredentials,
}

impl LdapGateway {
    pub fn new(settings: DirectorySettings, credentials: BindCredentials) -> Self {
        Self {
            settings,
            credentials,
        }
    }

    pub fn settings(&self) -> &DirectorySettings {
        &self.settings
    }

    fn connect(&self) -> Result<LdapConn, DirectoryError> {
        let conn_settings = LdapConnSettings::new().set_conn_timeout(self.settings.timeout);
        let mut ldap = LdapConn::with_settings(conn_settings, &self.settings.url).map_err(|e| {
            DirectoryError::Connection {
                url: self.settings.url.clone(),
                reason: e.to_string(),
            }
        })?;

        let principal = self.credentials.bind_principal(&self.settings.domain);
        ldap.simple_bind(&principal, self.credentials.password())
            .and_then(|result| result.success())
            .map_err(|e| DirectoryError::Bind {
                principal: principal.clone(),
                reason: e.to_string(),
            })?;
        debug!(url = %self.settings.url, %principal, "directory bind succeeded");
        Ok(ldap)
    }

    fn search(&self, filter: &str, attrs: Vec<&str>) -> Result<Vec<LdapEntry>, DirectoryError> {
        let mut ldap = self.connect()?;
        let (results, _) = ldap
            .with_timeout(self.settings.timeout)
            .search(&self.settings.base_dn, Scope::Subtree, filter, attrs)
            .and_then(|result| result.success())
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        if let Err(err) = ldap.unbind() {
            debug!("directory unbind failed: {err}");
        }

        Ok(results
            .into_iter()
            .map(SearchEntry::construct)
            .map(LdapEntry::from_search_entry)
            .collect())
    }
}

impl DirectoryGateway for LdapGateway {
    type Entry = LdapEntry;

    fn find_user(&self, account_name: &str) -> Result<Option<LdapEntry>, DirectoryError> {
        let filter = format!(
            "(&{}({}={}))",
            self.settings.user_filter,
            self.settings.attributes.account_name,
            ldap_escape(account_name)
        );
        let entries = self.search(&filter, vec!["*"])?;
        Ok(entries.into_iter().next())
    }

    fn list_users(&self) -> Result<Vec<LdapEntry>, DirectoryError> {
        let mut attrs = vec!["distinguishedName"];
        attrs.extend(self.settings.attributes.mapped_names());
        let entries = self.search(&self.settings.user_filter, attrs)?;
        info!(count = entries.len(), "enumerated directory users");
        Ok(entries)
    }
}
