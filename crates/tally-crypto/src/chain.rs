use chrono::{DateTime, Utc};
use tally_types::{format_timestamp, AuditEntry};

use crate::hasher::ContentHasher;

/// Trait for entries that participate in a hash chain.
pub trait ChainLink {
    /// The entry's stored hash.
    fn link_hash(&self) -> &str;
    /// The stored hash of the preceding entry (empty for genesis).
    fn prev_link_hash(&self) -> &str;
    /// Hash recomputed from the entry's stored fields.
    fn recompute_hash(&self) -> String;
}

impl ChainLink for AuditEntry {
    fn link_hash(&self) -> &str {
        &self.hash
    }

    fn prev_link_hash(&self) -> &str {
        &self.prev_hash
    }

    fn recompute_hash(&self) -> String {
        audit_hash(&self.prev_hash, &self.action, &self.details, &self.created_at)
    }
}

/// Hex digest binding an audit entry to its predecessor.
pub fn audit_hash(prev_hash: &str, action: &str, details: &str, created_at: &DateTime<Utc>) -> String {
    let timestamp = format_timestamp(created_at);
    hex::encode(ContentHasher::AUDIT.hash_fields(&[
        prev_hash.as_bytes(),
        action.as_bytes(),
        details.as_bytes(),
        timestamp.as_bytes(),
    ]))
}

/// Hash chain integrity verifier.
///
/// A valid chain has an empty `prev` on its first entry, every later entry's
/// `prev` equal to its predecessor's hash, and every stored hash equal to the
/// hash recomputed from the entry's fields.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Verify a chain, reporting the first broken index.
    pub fn verify_chain(links: &[impl ChainLink]) -> Result<(), ChainError> {
        let mut expected_prev = "";
        for (index, link) in links.iter().enumerate() {
            if index == 0 {
                if !link.prev_link_hash().is_empty() {
                    return Err(ChainError::GenesisHasPrevHash);
                }
            } else if link.prev_link_hash() != expected_prev {
                return Err(ChainError::BrokenLink { index });
            }

            if link.recompute_hash() != link.link_hash() {
                return Err(ChainError::HashMismatch { index });
            }
            expected_prev = link.link_hash();
        }
        Ok(())
    }

    /// Boolean form of [`HashChainVerifier::verify_chain`].
    pub fn is_valid(links: &[impl ChainLink]) -> bool {
        Self::verify_chain(links).is_ok()
    }
}

/// Errors from chain verification.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("genesis entry has a previous hash (should be empty)")]
    GenesisHasPrevHash,

    #[error("broken link at index {index}: prev_hash does not match")]
    BrokenLink { index: usize },

    #[error("hash mismatch at index {index}: computed hash differs from stored")]
    HashMismatch { index: usize },
}

impl ChainError {
    /// Index of the first entry that failed verification.
    pub fn index(&self) -> usize {
        match self {
            Self::GenesisHasPrevHash => 0,
            Self::BrokenLink { index } | Self::HashMismatch { index } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn build_chain(count: usize) -> Vec<AuditEntry> {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut chain: Vec<AuditEntry> = Vec::new();
        for i in 0..count {
            let prev_hash = chain.last().map(|e| e.hash.clone()).unwrap_or_default();
            let created_at = base + Duration::seconds(i as i64);
            let action = "create_address".to_string();
            let details = format!("record-{i}");
            let hash = audit_hash(&prev_hash, &action, &details, &created_at);
            chain.push(AuditEntry {
                id: format!("e{i}"),
                actor: "admin".into(),
                action,
                details,
                hash,
                prev_hash,
                created_at,
            });
        }
        chain
    }

    #[test]
    fn empty_chain_is_valid() {
        let chain: Vec<AuditEntry> = vec![];
        assert!(HashChainVerifier::verify_chain(&chain).is_ok());
    }

    #[test]
    fn multi_entry_chain() {
        let chain = build_chain(10);
        assert!(chain[0].prev_hash.is_empty());
        assert!(HashChainVerifier::is_valid(&chain));
    }

    #[test]
    fn genesis_with_prev_hash_fails() {
        let mut chain = build_chain(1);
        chain[0].prev_hash = "ff".into();
        assert_eq!(
            HashChainVerifier::verify_chain(&chain).unwrap_err(),
            ChainError::GenesisHasPrevHash
        );
    }

    #[test]
    fn broken_link_detected() {
        let mut chain = build_chain(3);
        chain[2].prev_hash = "00".repeat(32);
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::BrokenLink { index: 2 });
        assert_eq!(err.index(), 2);
    }

    #[test]
    fn tampered_details_detected() {
        let mut chain = build_chain(4);
        chain[1].details.push('x');
        assert_eq!(
            HashChainVerifier::verify_chain(&chain).unwrap_err(),
            ChainError::HashMismatch { index: 1 }
        );
    }

    #[test]
    fn tampered_action_detected() {
        let mut chain = build_chain(4);
        chain[3].action = "delete_address".into();
        assert_eq!(
            HashChainVerifier::verify_chain(&chain).unwrap_err(),
            ChainError::HashMismatch { index: 3 }
        );
    }

    #[test]
    fn tampered_timestamp_detected() {
        let mut chain = build_chain(2);
        chain[0].created_at += Duration::nanoseconds(1);
        assert!(!HashChainVerifier::is_valid(&chain));
    }

    #[test]
    fn actor_is_not_part_of_the_digest() {
        let mut chain = build_chain(2);
        chain[1].actor = "someone-else".into();
        assert!(HashChainVerifier::is_valid(&chain));
    }
}
