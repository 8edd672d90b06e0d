//! Append-only, hash-linked audit log.

use chrono::{DateTime, Utc};
use tally_crypto::{audit_hash, ChainError, HashChainVerifier};
use tally_types::{new_id, AuditEntry};

/// The audit chain. Entries are only ever appended.
#[derive(Clone, Debug, Default)]
pub struct AuditChain {
    entries: Vec<AuditEntry>,
}

impl AuditChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry linked to the current head.
    pub fn append(
        &mut self,
        actor: &str,
        action: &str,
        details: &str,
        created_at: DateTime<Utc>,
    ) -> AuditEntry {
        let prev_hash = self.head_hash().to_string();
        let entry = AuditEntry {
            id: new_id(),
            actor: actor.to_string(),
            action: action.to_string(),
            details: details.to_string(),
            hash: audit_hash(&prev_hash, action, details, &created_at),
            prev_hash,
            created_at,
        };
        self.entries.push(entry.clone());
        entry
    }

    /// Hash of the newest entry, or empty for an empty chain.
    pub fn head_hash(&self) -> &str {
        self.entries.last().map(|e| e.hash.as_str()).unwrap_or("")
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recompute every hash; `Err` names the first inconsistent entry.
    pub fn verify_report(&self) -> Result<(), ChainError> {
        HashChainVerifier::verify_chain(&self.entries)
    }

    pub fn verify(&self) -> bool {
        HashChainVerifier::is_valid(&self.entries)
    }

    #[cfg(test)]
    pub(crate) fn entries_mut(&mut self) -> &mut Vec<AuditEntry> {
        &mut self.entries
    }
}
