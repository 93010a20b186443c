//! Operator-facing configuration encryption. Everything here delegates to
//! [`SecretCipher`]; the only additions are input validation and the
//! copy-pasteable configuration snippets returned alongside each result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::cipher::{generate_key_material, CipherError, SecretCipher};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("value must not be empty")]
    EmptyValue,
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// Request body shared by the encrypt and decrypt operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValueRequest {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyGenerationResponse {
    pub key: String,
    pub iv: String,
    pub config_snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncryptResponse {
    pub original_value: String,
    pub encrypted_value: String,
    pub config_snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DecryptResponse {
    pub decrypted_value: String,
}

pub struct SecretCodec<'a> {
    cipher: &'a SecretCipher,
}

impl<'a> SecretCodec<'a> {
    pub fn new(cipher: &'a SecretCipher) -> Self {
        Self { cipher }
    }

    pub fn encrypt_value(&self, plain: &str) -> Result<String, CodecError> {
        require_value(plain)?;
        Ok(self.cipher.encrypt(plain))
    }

    pub fn decrypt_value(&self, cipher_text: &str) -> Result<String, CodecError> {
        require_value(cipher_text)?;
        Ok(self.cipher.decrypt(cipher_text)?)
    }

    pub fn encrypt(&self, request: &ValueRequest) -> Result<EncryptResponse, CodecError> {
        let encrypted_value = self.encrypt_value(&request.value)?;
        Ok(EncryptResponse {
            original_value: request.value.clone(),
            config_snippet: value_snippet(&encrypted_value),
            encrypted_value,
        })
    }

    pub fn decrypt(&self, request: &ValueRequest) -> Result<DecryptResponse, CodecError> {
        Ok(DecryptResponse {
            decrypted_value: self.decrypt_value(&request.value)?,
        })
    }
}

/// Key generation needs no existing key, so it is independent of any codec.
pub fn generate_keys() -> KeyGenerationResponse {
    let (key, iv) = generate_key_material();
    KeyGenerationResponse {
        config_snippet: key_snippet(&key, &iv),
        key,
        iv,
    }
}

fn require_value(value: &str) -> Result<(), CodecError> {
    if value.trim().is_empty() {
        return Err(CodecError::EmptyValue);
    }
    Ok(())
}

fn key_snippet(key: &str, iv: &str) -> String {
    format!("\"encryption\": {{\n  \"key\": \"{key}\",\n  \"iv\": \"{iv}\"\n}}")
}

fn value_snippet(encrypted: &str) -> String {
    format!("\"value\": \"{encrypted}\"")
}

#[cfg(test)]
mod tests {
    use super::{generate_keys, CodecError, SecretCodec, ValueRequest};
    use crate::crypto::cipher::SecretCipher;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde_json::json;

    fn cipher() -> SecretCipher {
        SecretCipher::from_base64(&STANDARD.encode([3u8; 32]), &STANDARD.encode([4u8; 16]))
            .expect("valid key material")
    }

    #[test]
    fn encrypt_then_decrypt_through_requests() {
        let cipher = cipher();
        let codec = SecretCodec::new(&cipher);
        let encrypted = codec
            .encrypt(&ValueRequest { value: "bind-password".into() })
            .expect("encrypt should succeed");
        assert_eq!(encrypted.original_value, "bind-password");
        assert!(encrypted.config_snippet.contains(&encrypted.encrypted_value));

        let decrypted = codec
            .decrypt(&ValueRequest { value: encrypted.encrypted_value })
            .expect("decrypt should succeed");
        assert_eq!(decrypted.decrypted_value, "bind-password");
    }

    #[test]
    fn rejects_empty_values() {
        let cipher = cipher();
        let codec = SecretCodec::new(&cipher);
        assert!(matches!(codec.encrypt_value(""), Err(CodecError::EmptyValue)));
        assert!(matches!(codec.decrypt_value("   "), Err(CodecError::EmptyValue)));
    }

    #[test]
    fn surfaces_decryption_failures() {
        let cipher = cipher();
        let codec = SecretCodec::new(&cipher);
        let err = codec.decrypt_value("!!!").unwrap_err();
        assert!(matches!(err, CodecError::Cipher(_)));
        assert!(format!("{err}").contains("decrypt"));
    }

    #[test]
    fn generated_keys_are_usable_and_shown_in_snippet() {
        let generated = generate_keys();
        assert!(generated.config_snippet.contains(&generated.key));
        assert!(generated.config_snippet.contains(&generated.iv));
        let cipher = SecretCipher::from_base64(&generated.key, &generated.iv)
            .expect("generated keys should load");
        assert_eq!(cipher.decrypt(&cipher.encrypt("v")).expect("round trip"), "v");
    }

    #[test]
    fn responses_use_camel_case_fields() {
        let cipher = cipher();
        let codec = SecretCodec::new(&cipher);
        let response = codec
            .encrypt(&ValueRequest { value: "x".into() })
            .expect("encrypt should succeed");
        let value = serde_json::to_value(&response).expect("serialize");
        assert!(value.get("originalValue").is_some());
        assert!(value.get("encryptedValue").is_some());
        assert!(value.get("configSnippet").is_some());

        let keys = serde_json::to_value(generate_keys()).expect("serialize");
        assert!(keys.get("configSnippet").is_some());

        let request: ValueRequest =
            serde_json::from_value(json!({ "value": "abc" })).expect("deserialize");
        assert_eq!(request.value, "abc");
    }
}
