//! Symmetric encryption for persisted credential payloads.
//!
//! Profiles are encrypted at rest with AES-256-GCM. The key is derived
//! deterministically per machine/user from a fixed application identifier
//! and a random salt generated once and persisted next to the profile
//! store. Losing the salt file makes every stored profile permanently
//! unrecoverable; that is a documented property of the design, not a bug.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use thiserror::Error;

const NONCE_SIZE: usize = 12;
const SALT_SIZE: usize = 32;

/// Domain separator mixed into the key derivation.
const KEY_CONTEXT: &[u8] = b"aquactl.profile-store.v1";

/// Error type for codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The ciphertext failed authentication: wrong key, tampered or
    /// corrupted data.
    #[error("failed to decrypt credential payload (wrong key or corrupted data)")]
    Decryption,

    /// The ciphertext is shorter than the nonce prefix.
    #[error("credential payload is truncated")]
    Truncated,

    /// Encryption itself failed; should not happen with a valid key.
    #[error("failed to encrypt credential payload")]
    Encryption,

    /// The derived key was rejected by the cipher.
    #[error("invalid key material")]
    InvalidKey,

    /// The persisted salt file exists but is not usable.
    #[error("salt file is malformed: expected {SALT_SIZE} bytes, got {got}")]
    MalformedSalt { got: usize },

    /// I/O error reading or creating the salt file.
    #[error("I/O error accessing key material: {0}")]
    Io(#[from] std::io::Error),
}

/// AES-256-GCM codec over a machine-scoped derived key.
pub struct SecretCodec {
    cipher: Aes256Gcm,
}

impl SecretCodec {
    /// Build a codec from raw salt bytes.
    pub fn from_salt(salt: &[u8]) -> Result<Self, CodecError> {
        let mut hasher = Sha256::new();
        hasher.update(KEY_CONTEXT);
        hasher.update(salt);
        let key = hasher.finalize();

        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CodecError::InvalidKey)?;
        Ok(Self { cipher })
    }

    /// Build a codec from a persisted salt file, generating the salt on
    /// first use.
    ///
    /// The file is created with owner-only permissions on unix.
    pub fn from_salt_file(path: &Path) -> Result<Self, CodecError> {
        let salt = if path.exists() {
            let bytes = fs::read(path)?;
            if bytes.len() != SALT_SIZE {
                return Err(CodecError::MalformedSalt { got: bytes.len() });
            }
            bytes
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut salt = vec![0u8; SALT_SIZE];
            rand::thread_rng().fill_bytes(&mut salt);
            fs::write(path, &salt)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
            }

            salt
        };

        Self::from_salt(&salt)
    }

    /// Encrypt a plaintext payload.
    ///
    /// The output is `nonce || ciphertext`; the nonce is random per call,
    /// so encrypting the same payload twice yields different bytes.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CodecError::Encryption)?;

        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.append(&mut ciphertext);
        Ok(output)
    }

    /// Decrypt a payload produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() < NONCE_SIZE {
            return Err(CodecError::Truncated);
        }

        let (nonce_bytes, payload) = data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, payload)
            .map_err(|_| CodecError::Decryption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_codec() -> SecretCodec {
        SecretCodec::from_salt(&[0xAB; SALT_SIZE]).unwrap()
    }

    #[test]
    fn roundtrip() {
        let codec = test_codec();
        let plaintext = b"{\"method\":\"api_key\"}";
        let ciphertext = codec.encrypt(plaintext).unwrap();
        let decrypted = codec.decrypt(&ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let codec_a = SecretCodec::from_salt(&[0x11; SALT_SIZE]).unwrap();
        let codec_b = SecretCodec::from_salt(&[0x22; SALT_SIZE]).unwrap();

        let ciphertext = codec_a.encrypt(b"secret").unwrap();
        assert!(matches!(
            codec_b.decrypt(&ciphertext),
            Err(CodecError::Decryption)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let codec = test_codec();
        let mut ciphertext = codec.encrypt(b"sensitive data").unwrap();
        let idx = NONCE_SIZE + 1;
        ciphertext[idx] ^= 0xFF;

        assert!(matches!(
            codec.decrypt(&ciphertext),
            Err(CodecError::Decryption)
        ));
    }

    #[test]
    fn truncated_ciphertext_fails() {
        let codec = test_codec();
        assert!(matches!(
            codec.decrypt(&[0u8; NONCE_SIZE - 1]),
            Err(CodecError::Truncated)
        ));
    }

    #[test]
    fn nonce_uniqueness() {
        let codec = test_codec();
        let ct1 = codec.encrypt(b"same input twice").unwrap();
        let ct2 = codec.encrypt(b"same input twice").unwrap();
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn salt_file_is_created_once_and_reused() {
        let temp = TempDir::new().unwrap();
        let salt_path = temp.path().join("key.salt");

        let codec_a = SecretCodec::from_salt_file(&salt_path).unwrap();
        let ciphertext = codec_a.encrypt(b"payload").unwrap();

        // A second codec from the same salt file must decrypt.
        let codec_b = SecretCodec::from_salt_file(&salt_path).unwrap();
        assert_eq!(codec_b.decrypt(&ciphertext).unwrap(), b"payload");
    }

    #[test]
    fn malformed_salt_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let salt_path = temp.path().join("key.salt");
        fs::write(&salt_path, b"short").unwrap();

        assert!(matches!(
            SecretCodec::from_salt_file(&salt_path),
            Err(CodecError::MalformedSalt { got: 5 })
        ));
    }
}
