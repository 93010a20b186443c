//! Projection of raw directory entries into [`DirectoryUserRecord`]s.
//!
//! Only the account name is mandatory. Every other field, and every extended
//! attribute, is read independently: a missing or unreadable attribute leaves
//! that one field empty and projection carries on.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::directory::entry::{AttributeReadError, AttributeValue, DirectoryEntry};

/// Directory attribute names read by the projector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributeMap {
    pub account_name: String,
    pub email: String,
    pub display_name: String,
    pub display_name_localized: String,
    pub profile_image: String,
}

impl Default for AttributeMap {
    fn default() -> Self {
        Self {
            account_name: "sAMAccountName".to_string(),
            email: "mail".to_string(),
            display_name: "displayName".to_string(),
            display_name_localized: "displayNamePrintable".to_string(),
            profile_image: "thumbnailPhoto".to_string(),
        }
    }
}

impl AttributeMap {
    /// Attributes that already have a dedicated record field.
    pub fn mapped_names(&self) -> [&str; 5] {
        [
            self.account_name.as_str(),
            self.email.as_str(),
            self.display_name.as_str(),
            self.display_name_localized.as_str(),
            self.profile_image.as_str(),
        ]
    }

    fn is_mapped(&self, name: &str) -> bool {
        self.mapped_names()
            .iter()
            .any(|mapped| mapped.eq_ignore_ascii_case(name))
    }
}

/// One queried identity, serialized as the lookup response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUserRecord {
    pub account_name: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub display_name_localized: Option<String>,
    /// Base64 of the raw image bytes.
    pub profile_image: Option<String>,
    pub extended_attributes: BTreeMap<String, String>,
}

/// Whether the caller asked for one user or a whole organizational unit.
/// Extended attributes are only collected for single lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    SingleUser,
    Listing,
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryUserProjector {
    attributes: AttributeMap,
}

impl DirectoryUserProjector {
    pub fn new(attributes: AttributeMap) -> Self {
        Self { attributes }
    }

    /// Returns `None` when the entry has no readable account name; callers
    /// treat that as "not found".
    pub fn project<E: DirectoryEntry + ?Sized>(
        &self,
        entry: &E,
        mode: ProjectionMode,
    ) -> Option<DirectoryUserRecord> {
        let account_name = self
            .read_text(entry, &self.attributes.account_name)
            .filter(|name| !name.is_empty())?;

        let email = self.read_text(entry, &self.attributes.email);
        let display_name = self.read_text(entry, &self.attributes.display_name);
        let display_name_localized = self.read_text(entry, &self.attributes.display_name_localized);
        let profile_image = self
            .read_optional(entry, &self.attributes.profile_image, |value| {
                Ok(value.into_bytes())
            })
            .filter(|bytes| !bytes.is_empty())
            .map(|bytes| STANDARD.encode(bytes));

        let extended_attributes = match mode {
            ProjectionMode::SingleUser => self.extended_attributes(entry),
            ProjectionMode::Listing => BTreeMap::new(),
        };

        Some(DirectoryUserRecord {
            account_name,
            email,
            display_name,
            display_name_localized,
            profile_image,
            extended_attributes,
        })
    }

    fn extended_attributes<E: DirectoryEntry + ?Sized>(&self, entry: &E) -> BTreeMap<String, String> {
        let mut extended = BTreeMap::new();
        for name in entry.attribute_names() {
            if self.attributes.is_mapped(&name) {
                continue;
            }
            if let Some(value) = self.read_text(entry, &name).filter(|v| !v.is_empty()) {
                extended.insert(name, value);
            }
        }
        extended
    }

    fn read_text<E: DirectoryEntry + ?Sized>(&self, entry: &E, name: &str) -> Option<String> {
        self.read_optional(entry, name, AttributeValue::into_text)
    }

    /// Reads one attribute as its own failure domain: absent and unreadable
    /// both come back as `None`.
    fn read_optional<E, T, F>(&self, entry: &E, name: &str, convert: F) -> Option<T>
    where
        E: DirectoryEntry + ?Sized,
        F: FnOnce(AttributeValue) -> Result<T, AttributeReadError>,
    {
        match entry.attribute(name).and_then(|value| value.map(convert).transpose()) {
            Ok(value) => value,
            Err(err) => {
                debug!(
                    dn = entry.distinguished_name(),
                    attribute = name,
                    "skipping unreadable attribute: {err}"
                );
                None
            }
        }
    }
}
