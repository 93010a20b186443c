//! Configuration loader. The file carries the base64 key material and the
//! encrypted bind credentials; credentials are decrypted in-memory here and
//! nothing plaintext is written back out.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::credentials::{BindCredentials, CredentialError, CredentialVault};
use crate::crypto::cipher::{CipherError, SecretCipher};
use crate::directory::gateway::{base_dn_from_domain, default_url, DirectorySettings, DEFAULT_USER_FILTER};
use crate::directory::projector::AttributeMap;

pub const CONFIG_PATH_ENV: &str = "DIRECTORY_GATEWAY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("environment variable {0} is required but missing")]
    MissingEnvVar(String),
    #[error("directory section is missing from the config")]
    MissingDirectory,
    #[error("directory domain must not be empty")]
    MissingDomain,
    #[error("key material error: {0}")]
    KeyMaterial(#[from] CipherError),
    #[error("credential error: {0}")]
    Credentials(#[from] CredentialError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionConfig {
    /// Base64 256-bit key.
    pub key: Option<String>,
    /// Base64 128-bit IV.
    pub iv: Option<String>,
    /// Environment variable holding the key; takes precedence over `key`.
    pub key_env: Option<String>,
    /// Environment variable holding the IV; takes precedence over `iv`.
    pub iv_env: Option<String>,
}

impl EncryptionConfig {
    pub fn build_cipher(&self) -> Result<SecretCipher, ConfigError> {
        let key = resolve(self.key_env.as_deref(), self.key.as_deref())?;
        let iv = resolve(self.iv_env.as_deref(), self.iv.as_deref())?;
        let cipher = SecretCipher::from_base64(&key, &iv)?;
        info!(fingerprint = %cipher.fingerprint(), "encryption key loaded");
        Ok(cipher)
    }
}

fn resolve(env_name: Option<&str>, inline: Option<&str>) -> Result<String, ConfigError> {
    match env_name {
        Some(var) => std::env::var(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string())),
        None => Ok(inline.unwrap_or_default().to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryConfig {
    pub domain: String,
    pub url: Option<String>,
    pub base_dn: Option<String>,
    pub user_filter: Option<String>,
    pub bind_username: String,
    pub bind_password: String,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl DirectoryConfig {
    pub fn settings(&self) -> Result<DirectorySettings, ConfigError> {
        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(ConfigError::MissingDomain);
        }
        Ok(DirectorySettings {
            domain: domain.to_string(),
            url: self.url.clone().unwrap_or_else(|| default_url(domain)),
            base_dn: self
                .base_dn
                .clone()
                .unwrap_or_else(|| base_dn_from_domain(domain)),
            user_filter: self
                .user_filter
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_FILTER.to_string()),
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            attributes: self.attributes.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGatewayConfig {
    #[serde(default)]
    pub encryption: EncryptionConfig,
    pub directory: Option<DirectoryConfig>,
    pub log_level: Option<String>,
}

impl RawGatewayConfig {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

/// Everything the running service needs, established once at startup.
pub struct RuntimeConfig {
    pub cipher: SecretCipher,
    pub credentials: BindCredentials,
    pub directory: DirectorySettings,
    pub log_level: String,
}

/// Reads and parses the file without touching any key material.
pub fn read_raw_config(path: impl AsRef<Path>) -> Result<RawGatewayConfig, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    serde_json::from_str(&raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))
}

impl RuntimeConfig {
    /// Builds the cipher and decrypts the bind credentials. Any error here
    /// means the process must not start.
    pub fn from_raw(raw: RawGatewayConfig) -> Result<Self, ConfigError> {
        let log_level = raw.log_level().to_string();
        let cipher = raw.encryption.build_cipher()?;
        let directory = raw.directory.ok_or(ConfigError::MissingDirectory)?;
        let settings = directory.settings()?;
        let credentials = CredentialVault::new(&cipher)
            .unseal(&directory.bind_username, &directory.bind_password)?;

        info!(
            domain = %settings.domain,
            url = %settings.url,
            bind_user = credentials.username(),
            "directory credentials decrypted"
        );

        Ok(Self {
            cipher,
            credentials,
            directory: settings,
            log_level,
        })
    }
}

/// Reads the file and runs the full startup sequence.
pub fn load_config(path: impl AsRef<Path>) -> Result<RuntimeConfig, ConfigError> {
    read_raw_config(path).and_then(RuntimeConfig::from_raw)
}
