//! Organizational-unit selection by distinguished name.
//!
//! Matching is a plain case-sensitive substring test on `OU=<name>`, so
//! `Sales` also matches `OU=SalesOps`. Callers rely on that loose policy.

use crate::directory::entry::DirectoryEntry;

pub struct OuFilter {
    needle: String,
}

impl OuFilter {
    pub fn new(ou: &str) -> Self {
        Self {
            needle: format!("OU={ou}"),
        }
    }

    pub fn matches<E: DirectoryEntry + ?Sized>(&self, entry: &E) -> bool {
        entry.distinguished_name().contains(&self.needle)
    }

    pub fn select<E: DirectoryEntry>(&self, entries: Vec<E>) -> Vec<E> {
        entries.into_iter().filter(|entry| self.matches(entry)).collect()
    }
}
