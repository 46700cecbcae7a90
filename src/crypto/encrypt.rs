//! Capsule payload encryption.
//!
//! Canonical capsule bytes are sealed with AES-256-GCM before anchoring.
//! The sealed blob carries a magic/version header so a corrupted or
//! foreign payload is distinguishable from a wrong-key failure:
//!
//! ```text
//! CAP1 || nonce(12) || ciphertext_with_tag
//! ```
//!
//! The AAD is a fixed domain constant: the anchored hex must remain
//! decryptable from the hex alone, so no per-record context is mixed in.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

/// Encryption key (32 bytes for AES-256)
pub type EncryptionKey = [u8; 32];

/// Nonce size for AES-GCM (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Magic prefix for sealed capsule blobs (format v1)
pub const CAPSULE_MAGIC_V1: &[u8; 4] = b"CAP1";

/// Domain constant bound into every seal as AAD
pub const CAPSULE_AAD_V1: &[u8] = b"CAPSA_CAPSULE_AAD_V1";

/// Error type for capsule sealing operations
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("ciphertext too short to be a sealed capsule")]
    InvalidCiphertext,

    #[error("payload is not a sealed capsule (bad magic)")]
    InvalidPayloadFormat,

    #[error("invalid encryption key: {0}")]
    InvalidKey(String),
}

/// Check whether a blob carries the sealed-capsule magic header
pub fn is_sealed_capsule(data: &[u8]) -> bool {
    data.len() >= CAPSULE_MAGIC_V1.len() && &data[..CAPSULE_MAGIC_V1.len()] == CAPSULE_MAGIC_V1
}

/// Seal canonical capsule bytes for anchoring.
///
/// Output format: `CAP1 || nonce(12) || ciphertext_with_tag`.
pub fn seal_capsule(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext_with_tag = cipher
        .encrypt(
            nonce,
            aes_gcm::aead::Payload {
                msg: plaintext,
                aad: CAPSULE_AAD_V1,
            },
        )
        .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

    let mut result =
        Vec::with_capacity(CAPSULE_MAGIC_V1.len() + NONCE_SIZE + ciphertext_with_tag.len());
    result.extend_from_slice(CAPSULE_MAGIC_V1);
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext_with_tag);
    Ok(result)
}

/// Open a sealed capsule blob back into canonical capsule bytes.
///
/// Structural failures (truncated blob, missing magic) map to
/// [`EncryptionError::InvalidCiphertext`] / [`EncryptionError::InvalidPayloadFormat`];
/// a tag mismatch under the right structure maps to
/// [`EncryptionError::DecryptionFailed`].
pub fn open_capsule(key: &EncryptionKey, sealed: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let header_len = CAPSULE_MAGIC_V1.len() + NONCE_SIZE;
    if sealed.len() < header_len + TAG_SIZE {
        return Err(EncryptionError::InvalidCiphertext);
    }
    if !is_sealed_capsule(sealed) {
        return Err(EncryptionError::InvalidPayloadFormat);
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

    let nonce_start = CAPSULE_MAGIC_V1.len();
    let nonce = Nonce::from_slice(&sealed[nonce_start..header_len]);
    let ciphertext = &sealed[header_len..];

    cipher
        .decrypt(
            nonce,
            aes_gcm::aead::Payload {
                msg: ciphertext,
                aad: CAPSULE_AAD_V1,
            },
        )
        .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))
}

/// Generate a new random encryption key
pub fn generate_key() -> EncryptionKey {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

/// Parse a 64-hex key from configuration
pub fn key_from_hex(s: &str) -> Result<EncryptionKey, EncryptionError> {
    let bytes = hex::decode(s.trim())
        .map_err(|e| EncryptionError::InvalidKey(format!("not hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| EncryptionError::InvalidKey("expected 32 bytes".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = generate_key();
        let plaintext = br#"{"version":1,"metadata":{"recordId":"r-1"}}"#;

        let sealed = seal_capsule(&key, plaintext).unwrap();
        assert!(is_sealed_capsule(&sealed));

        let opened = open_capsule(&key, &sealed).unwrap();
        assert_eq!(plaintext.as_slice(), opened.as_slice());
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let sealed = seal_capsule(&generate_key(), b"payload").unwrap();
        let err = open_capsule(&generate_key(), &sealed).unwrap_err();
        assert!(matches!(err, EncryptionError::DecryptionFailed(_)));
    }

    #[test]
    fn test_open_rejects_truncated_blob() {
        let err = open_capsule(&generate_key(), b"CAP1tooshort").unwrap_err();
        assert!(matches!(err, EncryptionError::InvalidCiphertext));
    }

    #[test]
    fn test_open_rejects_bad_magic() {
        let key = generate_key();
        let mut sealed = seal_capsule(&key, b"payload").unwrap();
        sealed[0] = b'X';
        let err = open_capsule(&key, &sealed).unwrap_err();
        assert!(matches!(err, EncryptionError::InvalidPayloadFormat));
    }

    #[test]
    fn test_tampered_ciphertext_fails_auth() {
        let key = generate_key();
        let mut sealed = seal_capsule(&key, b"payload").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;
        let err = open_capsule(&key, &sealed).unwrap_err();
        assert!(matches!(err, EncryptionError::DecryptionFailed(_)));
    }

    #[test]
    fn test_key_from_hex() {
        let key = generate_key();
        let parsed = key_from_hex(&hex::encode(key)).unwrap();
        assert_eq!(key, parsed);

        assert!(key_from_hex("abcd").is_err());
        assert!(key_from_hex("zz").is_err());
    }
}
