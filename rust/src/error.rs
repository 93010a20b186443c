//! Top-level error type for callers that drive the whole service.

use thiserror::Error;

use crate::config::ConfigError;
use crate::crypto::cipher::CipherError;
use crate::crypto::codec::CodecError;
use crate::directory::gateway::DirectoryError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("upstream directory error: {0}")]
    Directory(#[from] DirectoryError),
}

impl From<CipherError> for GatewayError {
    fn from(err: CipherError) -> Self {
        if err.is_configuration_error() {
            GatewayError::Configuration(ConfigError::KeyMaterial(err))
        } else {
            GatewayError::Codec(CodecError::Cipher(err))
        }
    }
}

impl GatewayError {
    /// Startup failures: the process must exit instead of serving requests.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::Configuration(_))
    }

    /// Failures the client caused and can fix by changing its input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GatewayError::Codec(_))
    }
}
