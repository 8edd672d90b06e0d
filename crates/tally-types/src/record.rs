use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::temporal::new_id;

/// Opaque record identifier, assigned by the store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a fresh time-ordered id.
    pub fn generate() -> Self {
        Self(new_id())
    }

    /// Wrap an existing id string (e.g. one read back from an export).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Soft references to records in other categories.
pub type Links = BTreeMap<Category, Vec<RecordId>>;

/// One inventory item within a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub links: Links,
    pub order: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Returns `true` if this record links to `id` in `category`.
    pub fn links_to(&self, category: Category, id: &RecordId) -> bool {
        self.links
            .get(&category)
            .is_some_and(|ids| ids.iter().any(|linked| linked == id))
    }
}

/// Caller-supplied fields for a new record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordDraft {
    pub name: String,
    pub description: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub links: Links,
}

impl RecordDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_link(mut self, category: Category, id: RecordId) -> Self {
        self.links.entry(category).or_default().push(id);
        self
    }
}

/// Partial update. `None` leaves a field unchanged; an empty map or list clears it.
///
/// A `description` of `Some("")` clears the description.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub attributes: Option<BTreeMap<String, String>>,
    pub tags: Option<Vec<String>>,
    pub links: Option<Links>,
}

/// A record as supplied by bulk import, before the store assigns order and timestamps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportedRecord {
    /// Kept when present; a blank or missing id is replaced with a fresh one.
    pub id: Option<RecordId>,
    pub name: String,
    pub description: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub links: Links,
    /// Kept when present; otherwise set to the import time.
    pub created_at: Option<DateTime<Utc>>,
}

impl From<RecordDraft> for ImportedRecord {
    fn from(draft: RecordDraft) -> Self {
        Self {
            id: None,
            name: draft.name,
            description: draft.description,
            attributes: draft.attributes,
            tags: draft.tags,
            links: draft.links,
            created_at: None,
        }
    }
}

/// Normalize a tag list: trim, drop empties, de-duplicate case-insensitively, sort.
///
/// Tags are folded to lowercase, so the result is stable under repeated application.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out: Vec<String> = tags
        .into_iter()
        .filter_map(|tag| {
            let folded = tag.as_ref().trim().to_lowercase();
            (!folded.is_empty() && seen.insert(folded.clone())).then_some(folded)
        })
        .collect();
    out.sort();
    out
}

/// Normalize a free-text description: blank becomes `None`.
pub fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

/// Normalize links held by a record of category `owner`.
///
/// Drops self-category keys, blank ids, duplicate ids, and empty lists.
/// First-seen order of ids is kept.
pub fn normalize_links(owner: Category, links: Links) -> Links {
    links
        .into_iter()
        .filter(|(category, _)| *category != owner)
        .filter_map(|(category, ids)| {
            let mut seen = HashSet::new();
            let ids: Vec<RecordId> = ids
                .into_iter()
                .filter(|id| !id.is_blank() && seen.insert(id.clone()))
                .collect();
            (!ids.is_empty()).then_some((category, ids))
        })
        .collect()
}
