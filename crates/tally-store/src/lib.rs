//! In-memory record store for Tally.
//!
//! [`LedgerStore`] holds three ordered record collections (addresses,
//! people, systems) behind a single lock, together with:
//!
//! - a bounded undo/redo history of whole-collection snapshots
//! - a hash-chained audit log, one entry per mutation
//! - a network allowlist that admits everything while empty
//! - a registry of single-use login challenges
//!
//! Durability is the caller's concern: export with
//! [`LedgerStore::export_rows`] and restore with [`LedgerStore::import_rows`].

pub mod allowlist;
pub mod audit;
pub mod challenge;
pub mod collection;
pub mod config;
pub mod error;
pub mod history;
pub mod ledger;
pub mod rows;
pub mod traits;

pub use allowlist::{Allowlist, IpRule};
pub use audit::AuditChain;
pub use challenge::ChallengeRegistry;
pub use collection::{Collections, LinkMatrix, MatrixLabel};
pub use config::StoreConfig;
pub use error::{ErrorKind, StoreError, StoreResult};
pub use history::{HistoryDepth, SnapshotHistory};
pub use ledger::LedgerStore;
pub use rows::{export_rows, records_from_rows};
pub use traits::{RecordReader, RecordWriter};
