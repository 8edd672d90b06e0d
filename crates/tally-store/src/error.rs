use std::fmt;

use tally_types::{Category, RecordId};

/// Errors from store operations.
///
/// Every variant maps to a stable [`ErrorKind`] so callers can branch on
/// a machine-readable code instead of the message text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{category} record not found: {id}")]
    NotFound { category: Category, id: RecordId },

    #[error("nothing to undo")]
    UndoUnavailable,

    #[error("nothing to redo")]
    RedoUnavailable,

    #[error("login challenge not found or already used")]
    ChallengeNotFound,

    #[error("invalid address range {cidr:?}: {reason}")]
    InvalidRange { cidr: String, reason: String },

    #[error("reorder expected {expected} ids, got {actual}")]
    OrderLengthMismatch { expected: usize, actual: usize },

    #[error("duplicate {category} record id: {id}")]
    DuplicateId { category: Category, id: RecordId },

    #[error("invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UndoUnavailable => ErrorKind::UndoUnavailable,
            Self::RedoUnavailable => ErrorKind::RedoUnavailable,
            Self::ChallengeNotFound => ErrorKind::ChallengeNotFound,
            Self::InvalidRange { .. } => ErrorKind::InvalidRange,
            Self::OrderLengthMismatch { .. } => ErrorKind::OrderLengthMismatch,
            Self::DuplicateId { .. } => ErrorKind::DuplicateId,
            Self::InvalidRow { .. } => ErrorKind::InvalidRow,
            Self::Config(_) => ErrorKind::Config,
            Self::Serialization(_) | Self::LockPoisoned => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(category: Category, id: &RecordId) -> Self {
        Self::NotFound {
            category,
            id: id.clone(),
        }
    }
}

/// Stable, machine-readable classification of a [`StoreError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    UndoUnavailable,
    RedoUnavailable,
    ChallengeNotFound,
    InvalidRange,
    OrderLengthMismatch,
    DuplicateId,
    InvalidRow,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::UndoUnavailable => "undo_unavailable",
            Self::RedoUnavailable => "redo_unavailable",
            Self::ChallengeNotFound => "challenge_not_found",
            Self::InvalidRange => "invalid_range",
            Self::OrderLengthMismatch => "order_length_mismatch",
            Self::DuplicateId => "duplicate_id",
            Self::InvalidRow => "invalid_row",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }

    /// Whether the caller can recover by changing its input or retrying.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
