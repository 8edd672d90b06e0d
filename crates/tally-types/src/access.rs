//! Access-control records: allowlist rules and login challenges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A network rule permitting callers from a single address or a range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowlistEntry {
    pub id: String,
    pub label: String,
    /// Single address (`10.0.0.1`) or network range (`10.0.0.0/8`).
    pub cidr: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied allowlist fields. An empty `id` inserts a new entry;
/// otherwise the entry with that id is replaced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowlistDraft {
    pub id: String,
    pub label: String,
    pub cidr: String,
    pub description: String,
}

impl AllowlistDraft {
    pub fn new(label: impl Into<String>, cidr: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            cidr: cidr.into(),
            ..Default::default()
        }
    }
}

/// A single-use token handed to a client during login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginChallenge {
    pub nonce: String,
    /// Human-readable text the client is asked to sign.
    pub message: String,
    pub created_at: DateTime<Utc>,
}
