//! Network allowlist gating caller addresses.
//!
//! An empty table permits every well-formed address. Once any rule exists,
//! an address must fall inside at least one rule.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tally_types::{new_id, AllowlistDraft, AllowlistEntry};

use crate::error::{StoreError, StoreResult};

/// A parsed allowlist rule: one address or a prefix-length network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IpRule {
    Single(IpAddr),
    Network { base: IpAddr, prefix: u8 },
}

impl IpRule {
    pub fn contains(&self, addr: IpAddr) -> bool {
        let addr = canonical(addr);
        match *self {
            Self::Single(single) => canonical(single) == addr,
            Self::Network { base, prefix } => match (canonical(base), addr) {
                (IpAddr::V4(base), IpAddr::V4(addr)) => {
                    let mask = prefix_mask_v4(prefix);
                    u32::from(base) & mask == u32::from(addr) & mask
                }
                (IpAddr::V6(base), IpAddr::V6(addr)) => {
                    let mask = prefix_mask_v6(prefix);
                    u128::from(base) & mask == u128::from(addr) & mask
                }
                _ => false,
            },
        }
    }
}

impl FromStr for IpRule {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cidr = s.trim();
        let invalid = |reason: String| StoreError::InvalidRange {
            cidr: s.to_string(),
            reason,
        };

        let Some((addr, prefix)) = cidr.split_once('/') else {
            return cidr
                .parse::<IpAddr>()
                .map(Self::Single)
                .map_err(|e| invalid(e.to_string()));
        };

        let base: IpAddr = addr.parse().map_err(|e: std::net::AddrParseError| invalid(e.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| invalid(format!("prefix {prefix:?} is not a number")))?;
        let max = if base.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(invalid(format!("prefix /{prefix} exceeds /{max}")));
        }
        Ok(Self::Network { base, prefix })
    }
}

impl fmt::Display for IpRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(addr) => write!(f, "{addr}"),
            Self::Network { base, prefix } => write!(f, "{base}/{prefix}"),
        }
    }
}

/// Treat IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) as IPv4.
fn canonical(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(addr),
        v4 => v4,
    }
}

fn prefix_mask_v4(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        p => u32::MAX << (32 - u32::from(p)),
    }
}

fn prefix_mask_v6(prefix: u8) -> u128 {
    match prefix {
        0 => 0,
        p => u128::MAX << (128 - u32::from(p)),
    }
}

/// Allowlist entries keyed by id, kept in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Allowlist {
    entries: Vec<(AllowlistEntry, IpRule)>,
}

impl Allowlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by id. An empty id inserts under a fresh id.
    /// Replacing keeps the original `created_at`.
    pub fn upsert(&mut self, draft: AllowlistDraft, now: DateTime<Utc>) -> StoreResult<AllowlistEntry> {
        let rule: IpRule = draft.cidr.parse()?;
        let id = match draft.id.trim() {
            "" => new_id(),
            id => id.to_string(),
        };
        let label = match draft.label.trim() {
            "" => rule.to_string(),
            label => label.to_string(),
        };

        let existing = self.entries.iter().position(|(entry, _)| entry.id == id);
        let created_at = existing.map(|i| self.entries[i].0.created_at).unwrap_or(now);
        let entry = AllowlistEntry {
            id,
            label,
            cidr: draft.cidr.trim().to_string(),
            description: draft.description,
            created_at,
            updated_at: now.max(created_at),
        };

        match existing {
            Some(i) => self.entries[i] = (entry.clone(), rule),
            None => self.entries.push((entry.clone(), rule)),
        }
        Ok(entry)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| entry.id != id);
        self.entries.len() != before
    }

    /// Entries ordered by creation time, oldest first.
    pub fn list(&self) -> Vec<AllowlistEntry> {
        let mut entries: Vec<AllowlistEntry> =
            self.entries.iter().map(|(entry, _)| entry.clone()).collect();
        entries.sort_by_key(|entry| entry.created_at);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `address` may access the console. Malformed input is never permitted.
    pub fn is_allowed(&self, address: &str) -> bool {
        match address.trim().parse::<IpAddr>() {
            Ok(addr) => self.permits(addr),
            Err(_) => false,
        }
    }

    pub fn permits(&self, addr: IpAddr) -> bool {
        self.entries.is_empty() || self.entries.iter().any(|(_, rule)| rule.contains(addr))
    }
}
