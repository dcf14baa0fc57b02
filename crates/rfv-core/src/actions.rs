use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RfvError};
use crate::models::RfvGrades;

// ── Curated actions ───────────────────────────────────────────────────────────

/// Best customers: recent, frequent, high spend.
pub const ACTION_AAA: &str = "Send discount coupons, ask them to refer our product to a friend, \
     send free samples when a new product launches.";

/// Lapsed, rare, low spend.
pub const ACTION_DDD: &str = "Churn! Customers who spent very little and bought rarely, take no action.";

/// Lapsed customers who used to buy a lot.
pub const ACTION_CHURNED_HIGH_VALUE: &str = "Churn! Customers who spent a lot and bought often, \
     send discount coupons to try to win them back.";

fn curated_actions() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("AAA".to_string(), ACTION_AAA.to_string());
    map.insert("DDD".to_string(), ACTION_DDD.to_string());
    map.insert("DAA".to_string(), ACTION_CHURNED_HIGH_VALUE.to_string());
    map.insert("CAA".to_string(), ACTION_CHURNED_HIGH_VALUE.to_string());
    map
}

// ── ActionTable ───────────────────────────────────────────────────────────────

/// Mapping from a 3-letter score to a recommended marketing action.
///
/// Only a handful of the 64 possible scores are curated; every other score
/// maps to no action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionTable {
    entries: BTreeMap<String, String>,
}

impl Default for ActionTable {
    fn default() -> Self {
        Self {
            entries: curated_actions(),
        }
    }
}

impl ActionTable {
    /// Build a table from explicit entries, validating every score key.
    pub fn from_entries(entries: BTreeMap<String, String>) -> Result<Self> {
        if let Some(bad) = entries.keys().find(|k| RfvGrades::parse_score(k).is_none()) {
            return Err(RfvError::Config(format!(
                "invalid score {bad:?} in action table (expected three letters A-D)"
            )));
        }
        Ok(Self { entries })
    }

    /// Parse a JSON object `{"AAA": "...", ...}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, String> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Load a JSON action table from `path`, replacing the curated defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RfvError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json_str(&content)?;
        debug!("Loaded {} actions from {}", table.len(), path.display());
        Ok(table)
    }

    /// The action for `score`, or `None` when the score is not curated.
    pub fn lookup(&self, score: &str) -> Option<&str> {
        self.entries.get(score).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(score, action)` pairs in score order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
