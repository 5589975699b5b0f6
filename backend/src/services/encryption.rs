use aes_gcm::aead::{rand_core::RngCore, Aead, OsRng};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::{engine::general_purpose, Engine as _};

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("encryption key must be exactly 32 bytes")]
    InvalidKey,
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed: {0}")]
    Decrypt(String),
}

/// AES-256-GCM sealing for secrets kept at rest (remote-access passwords).
///
/// Output is base64 of `nonce || ciphertext`.
#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl EncryptionService {
    pub fn new(key: &str) -> Result<Self, EncryptionError> {
        if key.len() != 32 {
            return Err(EncryptionError::InvalidKey);
        }

        let key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::Encrypt)?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(&sealed))
    }

    pub fn decrypt(&self, sealed: &str) -> Result<String, EncryptionError> {
        let bytes = general_purpose::STANDARD
            .decode(sealed)
            .map_err(|e| EncryptionError::Decrypt(format!("base64: {}", e)))?;

        if bytes.len() < NONCE_LEN {
            return Err(EncryptionError::Decrypt("payload too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| EncryptionError::Decrypt("authentication tag mismatch".to_string()))?;

        String::from_utf8(plaintext).map_err(|e| EncryptionError::Decrypt(e.to_string()))
    }
}

impl From<EncryptionError> for crate::error::AppError {
    fn from(err: EncryptionError) -> Self {
        Self::InternalError(err.to_string())
    }
}
