use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Classification of an inventory record.
///
/// The set is closed. [`Category::ALL`] fixes the iteration order used by
/// exports, link columns, and link matrices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Network addresses and ranges.
    Address,
    /// People responsible for or using inventory.
    Person,
    /// Hosts, appliances, and services.
    System,
}

impl Category {
    /// Every category, in stable iteration order.
    pub const ALL: [Category; 3] = [Self::Address, Self::Person, Self::System];

    /// The lowercase wire name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Person => "person",
            Self::System => "system",
        }
    }

    /// Position of this category within [`Category::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Self::Address => 0,
            Self::Person => 1,
            Self::System => 2,
        }
    }

    /// Audit action name for a verb applied to this category, e.g. `create_address`.
    pub fn action(&self, verb: &str) -> String {
        format!("{verb}_{}", self.as_str())
    }

    /// All categories other than `self`, in stable order.
    pub fn others(&self) -> impl Iterator<Item = Category> + '_ {
        Self::ALL.into_iter().filter(move |c| c != self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "address" => Ok(Self::Address),
            "person" => Ok(Self::Person),
            "system" => Ok(Self::System),
            other => Err(TypeError::UnknownCategory(other.to_string())),
        }
    }
}
