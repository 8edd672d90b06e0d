//! Trait boundaries for record access.
//!
//! The request layer depends on these rather than on [`LedgerStore`]
//! directly, so handlers can be exercised against any implementation.
//!
//! [`LedgerStore`]: crate::LedgerStore

use tally_types::{Category, ImportedRecord, Record, RecordDraft, RecordId, RecordPatch};

use crate::error::StoreResult;

/// Read access to records. Every returned value is an independent copy.
pub trait RecordReader: Send + Sync {
    /// Records of `category`, sorted by `order`.
    fn list(&self, category: Category) -> StoreResult<Vec<Record>>;

    /// One record, or `NotFound`.
    fn get(&self, category: Category, id: &RecordId) -> StoreResult<Record>;

    fn count(&self, category: Category) -> StoreResult<usize> {
        Ok(self.list(category)?.len())
    }
}

/// Mutating record operations.
///
/// Each successful call is one commit: one audit entry attributed to
/// `actor` and one undo step.
pub trait RecordWriter: Send + Sync {
    /// Append a new record at the end of its category.
    fn create(&self, category: Category, draft: RecordDraft, actor: &str) -> StoreResult<Record>;

    /// Overwrite the fields present in `patch`.
    fn update(
        &self,
        category: Category,
        id: &RecordId,
        patch: RecordPatch,
        actor: &str,
    ) -> StoreResult<Record>;

    /// Remove a record and renumber the rest of its category.
    fn delete(&self, category: Category, id: &RecordId, actor: &str) -> StoreResult<()>;

    /// Move the listed ids to the front; unlisted records follow in their old order.
    fn reorder(
        &self,
        category: Category,
        ordered_ids: &[RecordId],
        actor: &str,
    ) -> StoreResult<Vec<Record>>;

    /// Replace the whole category, as a single undo step.
    fn replace(
        &self,
        category: Category,
        records: Vec<ImportedRecord>,
        actor: &str,
    ) -> StoreResult<()>;
}
