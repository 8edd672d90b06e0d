//! Single-use login challenges.
//!
//! The registry only manages the nonce lifecycle. Signature checks belong
//! to the authentication layer that calls [`ChallengeRegistry::consume`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tally_types::{format_timestamp, new_nonce, LoginChallenge};

use crate::error::{StoreError, StoreResult};

#[derive(Clone, Debug)]
pub struct ChallengeRegistry {
    ttl: Duration,
    statement: String,
    pending: HashMap<String, LoginChallenge>,
}

impl ChallengeRegistry {
    pub fn new(ttl: std::time::Duration, statement: impl Into<String>) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            statement: statement.into(),
            pending: HashMap::new(),
        }
    }

    /// Issue a fresh challenge. Expired challenges are purged first.
    pub fn issue(&mut self, now: DateTime<Utc>) -> LoginChallenge {
        self.purge_expired(now);

        let mut nonce = new_nonce();
        while self.pending.contains_key(&nonce) {
            nonce = new_nonce();
        }
        let challenge = LoginChallenge {
            message: format!(
                "{}\n\nNonce: {nonce}\nIssued At: {}",
                self.statement,
                format_timestamp(&now)
            ),
            nonce,
            created_at: now,
        };
        self.pending
            .insert(challenge.nonce.clone(), challenge.clone());
        challenge
    }

    /// Remove and return the challenge for `nonce`.
    ///
    /// Unknown, already consumed, and expired nonces all fail with
    /// [`StoreError::ChallengeNotFound`].
    pub fn consume(&mut self, nonce: &str, now: DateTime<Utc>) -> StoreResult<LoginChallenge> {
        let challenge = self
            .pending
            .remove(nonce)
            .ok_or(StoreError::ChallengeNotFound)?;
        if self.is_expired(&challenge, now) {
            return Err(StoreError::ChallengeNotFound);
        }
        Ok(challenge)
    }

    /// Drop expired challenges, returning how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.pending.len();
        let ttl = self.ttl;
        self.pending
            .retain(|_, challenge| !expired(challenge, ttl, now));
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn is_expired(&self, challenge: &LoginChallenge, now: DateTime<Utc>) -> bool {
        expired(challenge, self.ttl, now)
    }
}

fn expired(challenge: &LoginChallenge, ttl: Duration, now: DateTime<Utc>) -> bool {
    challenge
        .created_at
        .checked_add_signed(ttl)
        .is_some_and(|deadline| now > deadline)
}
