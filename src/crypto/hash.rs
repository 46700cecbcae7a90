//! Deterministic content hashing for evidence files and audit capsules.
//!
//! Every hash in this crate is SHA-256 rendered as 64-character lowercase
//! hex. Evidence hashes are computed once at upload time and never
//! recomputed. The Merkle helpers implement SPV inclusion checking over the
//! chain's double-SHA-256 trees: txids and Merkle roots travel in display
//! (reversed) byte order, internal node hashing happens in wire order.

use sha2::{Digest, Sha256};

/// 32-byte SHA-256 hash
pub type Hash256 = [u8; 32];

/// Hash raw bytes with SHA-256
pub fn sha256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Double SHA-256, as used for chain txids and Merkle tree nodes
pub fn double_sha256(data: &[u8]) -> Hash256 {
    sha256(&sha256(data))
}

/// Hash raw bytes to 64-character lowercase hex.
///
/// Empty input is valid and hashes to the SHA-256 of zero bytes.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Hash a string (UTF-8 encoded, then SHA-256) to lowercase hex
pub fn hash_string(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Default prefix length for display truncation
pub const TRUNCATE_PREFIX: usize = 6;

/// Default suffix length for display truncation
pub const TRUNCATE_SUFFIX: usize = 6;

/// Shorten a hex hash for display: `"a1b2c3...d4e5f6"`.
///
/// Display transform only. Never use the truncated form for equality
/// checks or storage.
pub fn truncate_hash(hash: &str, prefix_len: usize, suffix_len: usize) -> String {
    if hash.len() <= prefix_len + suffix_len {
        return hash.to_string();
    }
    format!(
        "{}...{}",
        &hash[..prefix_len],
        &hash[hash.len() - suffix_len..]
    )
}

/// [`truncate_hash`] with the default 6/6 lengths
pub fn truncate_hash_default(hash: &str) -> String {
    truncate_hash(hash, TRUNCATE_PREFIX, TRUNCATE_SUFFIX)
}

/// Decode a 64-hex display-order hash (txid, Merkle root) into internal
/// wire-order bytes.
pub fn decode_display_hash(s: &str) -> Option<Hash256> {
    if s.len() != 64 {
        return None;
    }
    let bytes = hex::decode(s).ok()?;
    let mut hash: Hash256 = bytes.try_into().ok()?;
    hash.reverse();
    Some(hash)
}

/// Verify an SPV Merkle path from a txid up to a block's Merkle root.
///
/// `siblings` are the display-order sibling hashes from leaf level to the
/// level below the root; `index` is the leaf position in the block, which
/// determines left/right placement at each level. Returns `false` for
/// malformed hex as well as for a root mismatch.
pub fn verify_merkle_path(txid: &str, index: u64, siblings: &[String], merkle_root: &str) -> bool {
    let Some(mut current) = decode_display_hash(txid) else {
        return false;
    };
    let Some(root) = decode_display_hash(merkle_root) else {
        return false;
    };

    let mut idx = index;
    for sibling_hex in siblings {
        let Some(sibling) = decode_display_hash(sibling_hex) else {
            return false;
        };
        let mut preimage = [0u8; 64];
        if idx % 2 == 0 {
            preimage[..32].copy_from_slice(&current);
            preimage[32..].copy_from_slice(&sibling);
        } else {
            preimage[..32].copy_from_slice(&sibling);
            preimage[32..].copy_from_slice(&current);
        }
        current = double_sha256(&preimage);
        idx /= 2;
    }

    current == root
}
