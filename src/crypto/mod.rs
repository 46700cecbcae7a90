//! Cryptographic utilities: content hashing, SPV Merkle verification, and
//! capsule sealing.

mod encrypt;
mod hash;

pub use encrypt::{
    generate_key, is_sealed_capsule, key_from_hex, open_capsule, seal_capsule, EncryptionError,
    EncryptionKey, CAPSULE_AAD_V1, CAPSULE_MAGIC_V1, NONCE_SIZE, TAG_SIZE,
};
pub use hash::{
    decode_display_hash, double_sha256, hash_bytes, hash_string, sha256, truncate_hash,
    truncate_hash_default, verify_merkle_path, Hash256, TRUNCATE_PREFIX, TRUNCATE_SUFFIX,
};
