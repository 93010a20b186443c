//! Startup-time decryption of the directory bind credentials.

use std::fmt;

use thiserror::Error;
use zeroize::Zeroize;

use crate::crypto::cipher::{CipherError, SecretCipher};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("encrypted bind {0} is missing")]
    Missing(&'static str),
    #[error("bind {field} could not be decrypted: {source}")]
    Undecryptable {
        field: &'static str,
        #[source]
        source: CipherError,
    },
}

/// Plaintext bind credentials. The password is zeroized on drop and never
/// printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct BindCredentials {
    username: String,
    password: String,
}

impl BindCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Bare account names are bound as `<name>@<domain>`; UPNs and DNs pass through.
    pub fn bind_principal(&self, domain: &str) -> String {
        if self.username.contains('@') || self.username.contains('=') || domain.is_empty() {
            self.username.clone()
        } else {
            format!("{}@{}", self.username, domain)
        }
    }
}

impl fmt::Debug for BindCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Drop for BindCredentials {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// Turns the encrypted username/password pair from configuration into
/// usable credentials. Any failure here must stop the process.
pub struct CredentialVault<'a> {
    cipher: &'a SecretCipher,
}

impl<'a> CredentialVault<'a> {
    pub fn new(cipher: &'a SecretCipher) -> Self {
        Self { cipher }
    }

    pub fn unseal(
        &self,
        encrypted_username: &str,
        encrypted_password: &str,
    ) -> Result<BindCredentials, CredentialError> {
        let username = self.decrypt_field("username", encrypted_username)?;
        let password = self.decrypt_field("password", encrypted_password)?;
        Ok(BindCredentials { username, password })
    }

    fn decrypt_field(&self, field: &'static str, encrypted: &str) -> Result<String, CredentialError> {
        if encrypted.trim().is_empty() {
            return Err(CredentialError::Missing(field));
        }
        let plain = self
            .cipher
            .decrypt(encrypted)
            .map_err(|source| CredentialError::Undecryptable { field, source })?;
        if plain.is_empty() {
            return Err(CredentialError::Missing(field));
        }
        Ok(plain)
    }
}

#[cfg(test)]
mod tests {
    use super::{BindCredentials, CredentialError, CredentialVault};
    use crate::crypto::cipher::SecretCipher;
    use base64::{engine::general_purpose::STANDARD, Engine};

    fn cipher() -> SecretCipher {
        SecretCipher::from_base64(&STANDARD.encode([5u8; 32]), &STANDARD.encode([6u8; 16]))
            .expect("valid key material")
    }

    #[test]
    fn unseals_encrypted_credentials() {
        let cipher = cipher();
        let vault = CredentialVault::new(&cipher);
        let creds = vault
            .unseal(&cipher.encrypt("svc-directory"), &cipher.encrypt("hunter2"))
            .expect("credentials should decrypt");
        assert_eq!(creds.username(), "svc-directory");
        assert_eq!(creds.password(), "hunter2");
    }

    #[test]
    fn garbled_password_is_fatal() {
        let cipher = cipher();
        let vault = CredentialVault::new(&cipher);
        let err = vault
            .unseal(&cipher.encrypt("svc-directory"), "bm90LWEtcmVhbC1jaXBoZXJ0ZXh0")
            .unwrap_err();
        assert!(matches!(err, CredentialError::Undecryptable { field: "password", .. }));
    }

    #[test]
    fn missing_username_is_fatal() {
        let cipher = cipher();
        let vault = CredentialVault::new(&cipher);
        let err = vault.unseal("", &cipher.encrypt("hunter2")).unwrap_err();
        assert!(matches!(err, CredentialError::Missing("username")));
    }

    #[test]
    fn debug_output_redacts_password() {
        let creds = BindCredentials::new("svc", "hunter2");
        let printed = format!("{creds:?}");
        assert!(printed.contains("svc"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn bare_usernames_bind_as_upn() {
        assert_eq!(BindCredentials::new("svc", "p").bind_principal("corp.local"), "svc@corp.local");
        assert_eq!(
            BindCredentials::new("svc@corp.local", "p").bind_principal("corp.local"),
            "svc@corp.local"
        );
        assert_eq!(
            BindCredentials::new("CN=svc,DC=corp,DC=local", "p").bind_principal("corp.local"),
            "CN=svc,DC=corp,DC=local"
        );
    }
}
