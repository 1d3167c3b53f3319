//! Loading a JSON rules document into the rule tables.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::rules::{RuleCategory, RulePurpose};
use crate::storage::SqliteStore;

/// The on-disk shape accepted by `import-rules`. All arrays are optional:
///
/// ```json
/// {
///   "ignore": { "ips": ["10.0.0.1"], "urls": ["/health"] },
///   "delete": { "methods": ["OPTIONS"] }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct RulesDocument {
    #[serde(default)]
    pub ignore: RuleLists,
    #[serde(default)]
    pub delete: RuleLists,
}

#[derive(Debug, Default, Deserialize)]
pub struct RuleLists {
    #[serde(default)]
    pub ips: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
}

impl RuleLists {
    fn for_category(&self, category: RuleCategory) -> &[String] {
        match category {
            RuleCategory::Ip => &self.ips,
            RuleCategory::Url => &self.urls,
            RuleCategory::Server => &self.servers,
            RuleCategory::Method => &self.methods,
        }
    }
}

/// Read a JSON rules document and append its entries to the rule tables,
/// skipping entries that are already present. Reports per-category counts.
pub fn import_rules(store: &SqliteStore, path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read rules file: {}", path.display()))?;
    let document: RulesDocument = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse rules file: {}", path.display()))?;

    for (purpose, lists) in
        [(RulePurpose::Ignore, &document.ignore), (RulePurpose::Delete, &document.delete)]
    {
        for category in RuleCategory::ALL {
            let values = lists.for_category(category);
            if values.is_empty() {
                continue;
            }
            let added = store.append_rules(purpose, category, values)?;
            println!(
                "Added {} {} {} rule(s) ({} already present)",
                added,
                purpose.label(),
                category.label(),
                values.len() - added,
            );
        }
    }

    store.commit()?;
    Ok(())
}
