//! Property-based tests using proptest.
//!
//! These verify invariants that must hold for any input: hash determinism
//! and shape, confirmation monotonicity and clamping, display truncation,
//! and canonical-serialization stability.

use proptest::prelude::*;

use capsa_anchor::chain::{confirmations, ConfirmationPolicy, ConfirmationTracker};
use capsa_anchor::crypto::{hash_bytes, hash_string, truncate_hash};
use capsa_anchor::domain::{CapsuleBuilder, EvidenceFile, MerkleProof};

fn arb_proof(block_height: u64) -> MerkleProof {
    MerkleProof {
        txid: "ab".repeat(32),
        block_height,
        merkle_root: "cd".repeat(32),
        path: vec![],
        index: 0,
    }
}

proptest! {
    // ========================================================================
    // Hash determinism
    // ========================================================================

    #[test]
    fn prop_hash_bytes_is_64_hex_lowercase(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let hash = hash_bytes(&data);
        prop_assert_eq!(hash.len(), 64);
        prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn prop_hash_bytes_deterministic(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        prop_assert_eq!(hash_bytes(&data), hash_bytes(&data));
    }

    #[test]
    fn prop_hash_string_agrees_with_bytes(s in ".*") {
        prop_assert_eq!(hash_string(&s), hash_bytes(s.as_bytes()));
    }

    #[test]
    fn prop_evidence_hash_matches_content(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let evidence = EvidenceFile::from_bytes("f", "application/octet-stream", &data);
        prop_assert_eq!(evidence.hash, hash_bytes(&data));
        prop_assert_eq!(evidence.size, data.len() as u64);
    }

    // ========================================================================
    // Confirmation math
    // ========================================================================

    #[test]
    fn prop_confirmations_monotonic_in_height(block in 1u64..1_000_000, a in 0u64..2_000_000, b in 0u64..2_000_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(confirmations(block, lo) <= confirmations(block, hi));
    }

    #[test]
    fn prop_confirmations_clamp_when_height_stale(block in 1u64..1_000_000, behind in 1u64..1000) {
        let height = block.saturating_sub(behind);
        prop_assert_eq!(confirmations(block, height), 0);
    }

    #[test]
    fn prop_finality_exactly_at_threshold(block in 1u64..1_000_000, extra in 0u64..100) {
        let tracker = ConfirmationTracker::new(ConfirmationPolicy::default());
        let proof = arb_proof(block);
        let height = block + extra;
        let status = tracker.status(Some(&proof), height);
        let n = confirmations(block, height);
        prop_assert_eq!(status.is_confirmed(), n >= 6);
        prop_assert_eq!(status.confirmations(), n);
    }

    // ========================================================================
    // Display truncation
    // ========================================================================

    #[test]
    fn prop_truncate_shape(data in proptest::collection::vec(any::<u8>(), 0..128), p in 1usize..10, s in 1usize..10) {
        let hash = hash_bytes(&data);
        let truncated = truncate_hash(&hash, p, s);
        if p + s < hash.len() {
            prop_assert_eq!(truncated.len(), p + s + 3);
            prop_assert!(hash.starts_with(truncated.split("...").next().unwrap()));
            prop_assert!(hash.ends_with(truncated.rsplit("...").next().unwrap()));
        } else {
            prop_assert_eq!(truncated, hash);
        }
    }

    // ========================================================================
    // Canonical serialization
    // ========================================================================

    #[test]
    fn prop_canonical_bytes_stable_for_any_evidence(
        filename in "[a-zA-Z0-9._-]{1,32}",
        mimetype in "[a-z]{2,10}/[a-z0-9.-]{2,20}",
        content in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let capsule = CapsuleBuilder::new("leicca", "basket").build(
            None,
            None,
            vec![EvidenceFile::from_bytes(filename, mimetype, &content)],
            capsa_anchor::domain::new_record_id(),
        );
        let a = capsule.canonical_bytes().unwrap();
        let b = capsule.canonical_bytes().unwrap();
        prop_assert_eq!(&a, &b);

        let decoded = capsa_anchor::domain::AuditCapsule::from_canonical_bytes(&a).unwrap();
        prop_assert_eq!(decoded.canonical_bytes().unwrap(), a);
    }
}
