use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tally_crypto::{ChainError, ContentHasher};
use tally_types::{
    AllowlistDraft, AllowlistEntry, AuditEntry, Category, ImportedRecord, LoginChallenge,
    MonotonicClock, Record, RecordDraft, RecordId, RecordPatch,
};
use tracing::{debug, info, warn};

use crate::allowlist::Allowlist;
use crate::audit::AuditChain;
use crate::challenge::ChallengeRegistry;
use crate::collection::{Collections, LinkMatrix};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::history::{HistoryDepth, SnapshotHistory};
use crate::rows::{export_rows, records_from_rows};
use crate::traits::{RecordReader, RecordWriter};

/// The in-memory inventory store.
///
/// One `RwLock` guards every piece of state: records, undo history, audit
/// chain, allowlist, and pending challenges. Mutations take the write lock,
/// so record changes, their audit entry, and their undo frame land together
/// or not at all. Reads take the read lock and return copies.
pub struct LedgerStore {
    config: StoreConfig,
    inner: RwLock<LedgerState>,
}

struct LedgerState {
    clock: MonotonicClock,
    records: Collections,
    history: SnapshotHistory<Collections>,
    audit: AuditChain,
    allowlist: Allowlist,
    challenges: ChallengeRegistry,
}

impl LedgerState {
    /// Append the audit entry and the undo frame for a mutation already applied.
    fn commit(&mut self, actor: &str, action: &str, details: &str, now: DateTime<Utc>) {
        self.audit.append(actor, action, details, now);
        self.history.push(self.records.clone());
        debug!(
            actor,
            action,
            details,
            records = self.records.total_len(),
            undo = self.history.undo_count(),
            "committed"
        );
    }
}

impl LedgerStore {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::build(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: StoreConfig) -> Self {
        let records = Collections::new();
        let state = LedgerState {
            clock: MonotonicClock::new(),
            history: SnapshotHistory::new(config.history_capacity, records.clone()),
            records,
            audit: AuditChain::new(),
            allowlist: Allowlist::new(),
            challenges: ChallengeRegistry::new(
                config.challenge_ttl(),
                config.challenge_statement.clone(),
            ),
        };
        Self {
            config,
            inner: RwLock::new(state),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, LedgerState>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, LedgerState>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }

    // ---- Records ----

    /// Reorder requiring an exact permutation of the category's ids.
    ///
    /// An empty category with an empty id list is left alone and not audited.
    pub fn reorder_exact(
        &self,
        category: Category,
        ordered_ids: &[RecordId],
        actor: &str,
    ) -> StoreResult<Vec<Record>> {
        let mut state = self.write()?;
        if state.records.records(category).is_empty() && ordered_ids.is_empty() {
            return Ok(Vec::new());
        }
        let now = state.clock.now();
        let records = state.records.reorder_exact(category, ordered_ids, now)?;
        state.commit(
            actor,
            &category.action("reorder"),
            &format!("count={}", records.len()),
            now,
        );
        Ok(records)
    }

    /// Parse rows in the export layout and replace the category with them.
    pub fn import_rows(
        &self,
        category: Category,
        rows: &[Vec<String>],
        actor: &str,
    ) -> StoreResult<()> {
        let imported = records_from_rows(rows)?;
        self.replace(category, imported, actor)
    }

    /// The category as rows-of-strings, header first.
    pub fn export_rows(&self, category: Category) -> StoreResult<Vec<Vec<String>>> {
        let state = self.read()?;
        Ok(export_rows(category, state.records.records(category)))
    }

    /// Linked records that still exist; dangling ids resolve to nothing.
    pub fn resolve_links(
        &self,
        category: Category,
        id: &RecordId,
    ) -> StoreResult<BTreeMap<Category, Vec<Record>>> {
        self.read()?.records.resolve_links(category, id)
    }

    pub fn link_matrix(&self, from: Category, to: Category) -> StoreResult<LinkMatrix> {
        Ok(self.read()?.records.link_matrix(from, to))
    }

    /// A copy of every category's records at this instant.
    pub fn snapshot(&self) -> StoreResult<Collections> {
        Ok(self.read()?.records.clone())
    }

    /// Hex digest of all records, changing whenever any record does.
    pub fn state_digest(&self) -> StoreResult<String> {
        let state = self.read()?;
        let view: Vec<(Category, &[Record])> = Category::ALL
            .iter()
            .map(|category| (*category, state.records.records(*category)))
            .collect();
        let digest = ContentHasher::STATE
            .hash_json(&view)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(hex::encode(digest))
    }

    // ---- History ----

    /// Restore the previous state of all categories.
    ///
    /// Undo is not written to the audit chain.
    pub fn undo(&self) -> StoreResult<HistoryDepth> {
        let mut state = self.write()?;
        let snapshot = state.history.undo()?;
        state.records = snapshot;
        let depth = state.history.depth();
        info!(undo = depth.undo, redo = depth.redo, "undo applied");
        Ok(depth)
    }

    /// Re-apply the most recently undone state.
    ///
    /// Redo is not written to the audit chain.
    pub fn redo(&self) -> StoreResult<HistoryDepth> {
        let mut state = self.write()?;
        let snapshot = state.history.redo()?;
        state.records = snapshot;
        let depth = state.history.depth();
        info!(undo = depth.undo, redo = depth.redo, "redo applied");
        Ok(depth)
    }

    pub fn history_depth(&self) -> StoreResult<HistoryDepth> {
        Ok(self.read()?.history.depth())
    }

    // ---- Audit ----

    /// Every audit entry, oldest first.
    pub fn audit_log(&self) -> StoreResult<Vec<AuditEntry>> {
        Ok(self.read()?.audit.entries().to_vec())
    }

    /// `true` when every audit entry's hash matches its recorded fields.
    pub fn verify_audit(&self) -> StoreResult<bool> {
        let valid = self.read()?.audit.verify();
        if !valid {
            warn!("audit chain verification failed");
        }
        Ok(valid)
    }

    /// The first inconsistency in the audit chain, if any.
    pub fn verify_audit_report(&self) -> StoreResult<Option<ChainError>> {
        let state = self.read()?;
        match state.audit.verify_report() {
            Ok(()) => Ok(None),
            Err(broken) => {
                warn!(index = broken.index(), error = %broken, "audit chain verification failed");
                Ok(Some(broken))
            }
        }
    }

    // ---- Allowlist ----

    pub fn upsert_allowlist(&self, draft: AllowlistDraft, actor: &str) -> StoreResult<AllowlistEntry> {
        let mut state = self.write()?;
        let now = state.clock.now();
        let entry = state.allowlist.upsert(draft, now).inspect_err(|e| {
            warn!(error = %e, "allowlist entry rejected");
        })?;
        state.audit.append(actor, "upsert_allowlist", &entry.id, now);
        info!(id = %entry.id, cidr = %entry.cidr, "allowlist entry saved");
        Ok(entry)
    }

    pub fn remove_allowlist(&self, id: &str, actor: &str) -> StoreResult<bool> {
        let mut state = self.write()?;
        let removed = state.allowlist.remove(id);
        if removed {
            let now = state.clock.now();
            state.audit.append(actor, "remove_allowlist", id, now);
            info!(id, "allowlist entry removed");
        }
        Ok(removed)
    }

    /// Allowlist entries, oldest first.
    pub fn allowlist(&self) -> StoreResult<Vec<AllowlistEntry>> {
        Ok(self.read()?.allowlist.list())
    }

    /// Whether `address` passes the allowlist. An empty allowlist admits
    /// every well-formed address; malformed addresses never pass.
    pub fn is_allowed(&self, address: &str) -> StoreResult<bool> {
        Ok(self.read()?.allowlist.is_allowed(address))
    }

    // ---- Login challenges ----

    pub fn issue_challenge(&self) -> StoreResult<LoginChallenge> {
        let mut state = self.write()?;
        let now = state.clock.now();
        let challenge = state.challenges.issue(now);
        debug!(pending = state.challenges.len(), "login challenge issued");
        Ok(challenge)
    }

    /// Take the challenge for `nonce`. Succeeds at most once per nonce.
    pub fn consume_challenge(&self, nonce: &str) -> StoreResult<LoginChallenge> {
        let mut state = self.write()?;
        let now = state.clock.now();
        state.challenges.consume(nonce, now).inspect_err(|_| {
            warn!("unknown, used, or expired login challenge");
        })
    }

    pub fn pending_challenges(&self) -> StoreResult<usize> {
        Ok(self.read()?.challenges.len())
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordReader for LedgerStore {
    fn list(&self, category: Category) -> StoreResult<Vec<Record>> {
        Ok(self.read()?.records.records(category).to_vec())
    }

    fn get(&self, category: Category, id: &RecordId) -> StoreResult<Record> {
        self.read()?.records.get(category, id).cloned()
    }

    fn count(&self, category: Category) -> StoreResult<usize> {
        Ok(self.read()?.records.records(category).len())
    }
}

impl RecordWriter for LedgerStore {
    fn create(&self, category: Category, draft: RecordDraft, actor: &str) -> StoreResult<Record> {
        let mut state = self.write()?;
        let now = state.clock.now();
        let record = state.records.create(category, draft, now);
        state.commit(actor, &category.action("create"), record.id.as_str(), now);
        Ok(record)
    }

    fn update(
        &self,
        category: Category,
        id: &RecordId,
        patch: RecordPatch,
        actor: &str,
    ) -> StoreResult<Record> {
        let mut state = self.write()?;
        let now = state.clock.now();
        let record = state.records.update(category, id, patch, now)?;
        state.commit(actor, &category.action("update"), id.as_str(), now);
        Ok(record)
    }

    fn delete(&self, category: Category, id: &RecordId, actor: &str) -> StoreResult<()> {
        let mut state = self.write()?;
        let now = state.clock.now();
        state.records.delete(category, id, now)?;
        state.commit(actor, &category.action("delete"), id.as_str(), now);
        Ok(())
    }

    fn reorder(
        &self,
        category: Category,
        ordered_ids: &[RecordId],
        actor: &str,
    ) -> StoreResult<Vec<Record>> {
        let mut state = self.write()?;
        if state.records.records(category).is_empty() {
            return Ok(Vec::new());
        }
        let now = state.clock.now();
        let records = state.records.reorder(category, ordered_ids, now);
        state.commit(
            actor,
            &category.action("reorder"),
            &format!("count={}", records.len()),
            now,
        );
        Ok(records)
    }

    fn replace(
        &self,
        category: Category,
        records: Vec<ImportedRecord>,
        actor: &str,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        let now = state.clock.now();
        let replaced = state.records.replace(category, records, now)?;
        state.commit(
            actor,
            &category.action("replace"),
            &format!("count={}", replaced.len()),
            now,
        );
        Ok(())
    }
}
