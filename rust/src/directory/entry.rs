//! Raw directory entries as the projector sees them: a distinguished name plus
//! named attributes that may be missing, textual, or binary.

use std::collections::HashMap;

use ldap3::SearchEntry;
use thiserror::Error;

/// A single attribute value as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Binary(Vec<u8>),
}

impl AttributeValue {
    /// String conversion used for optional and extended attributes.
    pub fn into_text(self) -> Result<String, AttributeReadError> {
        match self {
            AttributeValue::Text(text) => Ok(text),
            AttributeValue::Binary(bytes) => {
                String::from_utf8(bytes).map_err(|_| AttributeReadError::TypeMismatch {
                    expected: "text",
                })
            }
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            AttributeValue::Text(text) => text.into_bytes(),
            AttributeValue::Binary(bytes) => bytes,
        }
    }
}

/// Failure to read one attribute. Absorbed by the projector, never surfaced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttributeReadError {
    #[error("attribute value is not {expected}")]
    TypeMismatch { expected: &'static str },
    #[error("attribute could not be read: {0}")]
    Unreadable(String),
}

/// Capability exposed by every resolved directory principal.
pub trait DirectoryEntry {
    fn distinguished_name(&self) -> &str;

    /// Reads one attribute. `Ok(None)` means the attribute is absent.
    fn attribute(&self, name: &str) -> Result<Option<AttributeValue>, AttributeReadError>;

    /// Names of every attribute present on the entry.
    fn attribute_names(&self) -> Vec<String>;
}

/// Entry returned by an LDAP search. Values that are not valid UTF-8 arrive
/// in `binary_attributes`.
#[derive(Debug, Clone, Default)]
pub struct LdapEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
    pub binary_attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl LdapEntry {
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
            binary_attributes: entry.bin_attrs,
        }
    }

    // LDAP attribute descriptions are case-insensitive.
    fn lookup<'a, T>(map: &'a HashMap<String, T>, name: &str) -> Option<&'a T> {
        map.get(name).or_else(|| {
            map.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }
}

impl DirectoryEntry for LdapEntry {
    fn distinguished_name(&self) -> &str {
        &self.dn
    }

    fn attribute(&self, name: &str) -> Result<Option<AttributeValue>, AttributeReadError> {
        if let Some(values) = Self::lookup(&self.attributes, name) {
            return Ok(values.first().cloned().map(AttributeValue::Text));
        }
        if let Some(values) = Self::lookup(&self.binary_attributes, name) {
            return Ok(values.first().cloned().map(AttributeValue::Binary));
        }
        Ok(None)
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes
            .keys()
            .chain(self.binary_attributes.keys())
            .cloned()
            .collect()
    }
}
