//! Console configuration and seed data.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tally_store::StoreConfig;
use tally_types::{AllowlistDraft, Category, ImportedRecord};

/// Settings read from the `--config` TOML file.
///
/// ```toml
/// actor = "ops@example"
///
/// [store]
/// history_capacity = 11
///
/// [[allowlist]]
/// label = "office"
/// cidr = "10.0.0.0/8"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Attributed to every change the console makes while loading.
    pub actor: String,
    pub store: StoreConfig,
    pub allowlist: Vec<AllowlistDraft>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            actor: "tally-cli".into(),
            store: StoreConfig::default(),
            allowlist: Vec::new(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("invalid console config")?;
        config.store.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text)
    }
}

/// Records to load per category, in [`Category::ALL`] order.
pub type Seed = Vec<(Category, Vec<ImportedRecord>)>;

/// Parse a seed document: a JSON object from category name to records.
pub fn parse_seed(text: &str) -> anyhow::Result<Seed> {
    let raw: BTreeMap<String, Vec<ImportedRecord>> =
        serde_json::from_str(text).context("invalid seed file")?;
    let mut seed = Vec::with_capacity(raw.len());
    for (name, records) in raw {
        let category: Category = name.parse()?;
        seed.push((category, records));
    }
    seed.sort_by_key(|(category, _)| *category);
    Ok(seed)
}

pub fn load_seed(path: &Path) -> anyhow::Result<Seed> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed {}", path.display()))?;
    parse_seed(&text)
}
