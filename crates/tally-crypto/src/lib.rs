//! Cryptographic primitives for Tally.
//!
//! Provides domain-separated BLAKE3 hashing and verification of the audit
//! hash chain. Integrity only: nothing here proves authorship.

pub mod chain;
pub mod hasher;

pub use chain::{audit_hash, ChainError, ChainLink, HashChainVerifier};
pub use hasher::{ContentHasher, HasherError};
