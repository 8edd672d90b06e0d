//! Foundation types for Tally, an in-memory inventory ledger.
//!
//! Every other Tally crate depends on `tally-types`.
//!
//! # Key Types
//!
//! - [`Category`]: Closed set of record classifications with a fixed order
//! - [`Record`]: One inventory item, with tags, attributes, and soft links
//! - [`RecordDraft`] / [`RecordPatch`] / [`ImportedRecord`]: Caller inputs
//! - [`AuditEntry`]: One link of the hash-chained audit log
//! - [`AllowlistEntry`] / [`LoginChallenge`]: Access-control records
//! - [`MonotonicClock`]: Non-decreasing UTC clock

pub mod access;
pub mod audit;
pub mod category;
pub mod error;
pub mod record;
pub mod temporal;

pub use access::{AllowlistDraft, AllowlistEntry, LoginChallenge};
pub use audit::AuditEntry;
pub use category::Category;
pub use error::TypeError;
pub use record::{
    normalize_description, normalize_links, normalize_tags, ImportedRecord, Links, Record,
    RecordDraft, RecordId, RecordPatch,
};
pub use temporal::{format_timestamp, new_id, new_nonce, parse_timestamp, MonotonicClock};
