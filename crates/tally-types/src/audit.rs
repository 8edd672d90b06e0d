use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One link in the append-only audit chain.
///
/// `hash` commits to `prev_hash`, `action`, `details`, and `created_at`.
/// The first entry of a chain has an empty `prev_hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    /// Caller identity the action is attributed to.
    pub actor: String,
    /// Verb plus subject, e.g. `create_address`.
    pub action: String,
    /// Free text such as the affected id or a count.
    pub details: String,
    pub hash: String,
    pub prev_hash: String,
    pub created_at: DateTime<Utc>,
}
