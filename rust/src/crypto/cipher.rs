//! AES-256-CBC secret cipher over a fixed key/IV pair.
//! Ciphertexts are plain base64 strings with no envelope, so values already
//! written into configuration files keep decrypting after upgrades.
//!
//! The IV never changes for the lifetime of the key, which means equal
//! plaintexts produce equal ciphertexts. This protects credentials at rest from
//! casual disclosure only; it is not a defense against an active attacker.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;

const FINGERPRINT_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption {0} is missing")]
    MissingKeyMaterial(&'static str),
    #[error("encryption {0} is not valid base64")]
    InvalidBase64Key(&'static str),
    #[error("encryption {name} must decode to {expected} bytes, got {actual}")]
    InvalidKeyLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{operation} failed: {reason}")]
    DecryptionFailed {
        operation: &'static str,
        reason: &'static str,
    },
}

impl CipherError {
    fn decrypt(reason: &'static str) -> Self {
        CipherError::DecryptionFailed {
            operation: "decrypt",
            reason,
        }
    }

    /// Key material problems can only happen while the process is starting.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, CipherError::DecryptionFailed { .. })
    }
}

/// Decoded 256-bit key and 128-bit IV. Lengths are checked on construction.
pub struct EncryptionKeyMaterial {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl EncryptionKeyMaterial {
    pub fn from_bytes(key: &[u8], iv: &[u8]) -> Result<Self, CipherError> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| CipherError::InvalidKeyLength {
            name: "key",
            expected: KEY_LEN,
            actual: key.len(),
        })?;
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| CipherError::InvalidKeyLength {
            name: "iv",
            expected: IV_LEN,
            actual: iv.len(),
        })?;
        Ok(Self { key, iv })
    }

    /// Decodes the base64 key and IV exactly as they appear in configuration.
    pub fn from_base64(key: &str, iv: &str) -> Result<Self, CipherError> {
        let mut key_bytes = decode_component("key", key)?;
        let mut iv_bytes = decode_component("iv", iv)?;
        let material = Self::from_bytes(&key_bytes, &iv_bytes);
        key_bytes.zeroize();
        iv_bytes.zeroize();
        material
    }

    /// Generates a fresh random key/IV pair from the OS RNG.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut key);
        OsRng.fill_bytes(&mut iv);
        Self { key, iv }
    }

    pub fn key_base64(&self) -> String {
        STANDARD.encode(self.key)
    }

    pub fn iv_base64(&self) -> String {
        STANDARD.encode(self.iv)
    }
}

impl Drop for EncryptionKeyMaterial {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

fn decode_component(name: &'static str, encoded: &str) -> Result<Vec<u8>, CipherError> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(CipherError::MissingKeyMaterial(name));
    }
    STANDARD
        .decode(trimmed.as_bytes())
        .map_err(|_| CipherError::InvalidBase64Key(name))
}

/// Generates a new key/IV pair without needing a cipher instance.
/// Returns `(base64 key, base64 iv)`.
pub fn generate_key_material() -> (String, String) {
    let material = EncryptionKeyMaterial::generate();
    (material.key_base64(), material.iv_base64())
}

/// Symmetric cipher shared read-only by every request for the process lifetime.
pub struct SecretCipher {
    material: EncryptionKeyMaterial,
}

impl SecretCipher {
    pub fn new(material: EncryptionKeyMaterial) -> Self {
        Self { material }
    }

    pub fn from_base64(key: &str, iv: &str) -> Result<Self, CipherError> {
        EncryptionKeyMaterial::from_base64(key, iv).map(Self::new)
    }

    /// Encrypts UTF-8 text into base64 ciphertext. Empty input yields empty output.
    pub fn encrypt(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }
        let ciphertext = Aes256CbcEnc::new(&self.material.key.into(), &self.material.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        STANDARD.encode(ciphertext)
    }

    /// Decrypts base64 ciphertext produced by [`SecretCipher::encrypt`].
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }
        let raw = STANDARD
            .decode(ciphertext.trim().as_bytes())
            .map_err(|_| CipherError::decrypt("ciphertext is not valid base64"))?;
        let plaintext = Aes256CbcDec::new(&self.material.key.into(), &self.material.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&raw)
            .map_err(|_| CipherError::decrypt("padding did not validate"))?;
        String::from_utf8(plaintext).map_err(|err| {
            let mut bytes = err.into_bytes();
            bytes.zeroize();
            CipherError::decrypt("plaintext is not valid UTF-8")
        })
    }

    /// Short SHA-256 fingerprint of the key and IV, safe to log.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.material.key);
        hasher.update(self.material.iv);
        let digest = hasher.finalize();
        digest[..FINGERPRINT_LEN]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}
