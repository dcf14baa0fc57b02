//! Typed description of the expected input columns and how to read them.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RfvError};

/// Default column holding the customer identifier.
pub const DEFAULT_CUSTOMER_COLUMN: &str = "ID_cliente";
/// Default column holding the purchase date.
pub const DEFAULT_DATE_COLUMN: &str = "DiaCompra";
/// Default column holding the purchase identifier.
pub const DEFAULT_PURCHASE_COLUMN: &str = "CodigoCompra";
/// Default column holding the purchase amount.
pub const DEFAULT_VALUE_COLUMN: &str = "ValorTotal";

/// Patterns tried, in order, when no explicit `date_format` is configured.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Logical field → column name mapping for the transaction table.
///
/// Column names are matched exactly (case-sensitive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSchema {
    pub customer_id: String,
    pub purchase_date: String,
    pub purchase_code: String,
    pub total_value: String,
    /// Explicit chrono pattern for `purchase_date`. May be date-only.
    pub date_format: Option<String>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            customer_id: DEFAULT_CUSTOMER_COLUMN.to_string(),
            purchase_date: DEFAULT_DATE_COLUMN.to_string(),
            purchase_code: DEFAULT_PURCHASE_COLUMN.to_string(),
            total_value: DEFAULT_VALUE_COLUMN.to_string(),
            date_format: None,
        }
    }
}

impl ColumnSchema {
    /// Load a schema from a JSON file. Omitted fields keep their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RfvError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let schema: Self = serde_json::from_str(&content)?;
        schema.validate()?;
        debug!("Loaded column schema from {}", path.display());
        Ok(schema)
    }

    /// The four required column names in a fixed order.
    pub fn required_columns(&self) -> [&str; 4] {
        [
            &self.customer_id,
            &self.purchase_date,
            &self.purchase_code,
            &self.total_value,
        ]
    }

    /// Reject empty or duplicated column names.
    pub fn validate(&self) -> Result<()> {
        let cols = self.required_columns();
        if let Some(empty) = cols.iter().position(|c| c.trim().is_empty()) {
            return Err(RfvError::Config(format!(
                "column name #{} in schema is empty",
                empty + 1
            )));
        }
        for (i, a) in cols.iter().enumerate() {
            if cols[i + 1..].contains(a) {
                return Err(RfvError::Config(format!(
                    "column {a:?} is mapped to more than one field"
                )));
            }
        }
        Ok(())
    }

    /// Parse a purchase-date cell according to this schema.
    pub fn parse_date(&self, raw: &str) -> Option<NaiveDateTime> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        match &self.date_format {
            Some(fmt) => parse_with(s, fmt),
            None => parse_date_auto(s),
        }
    }
}

fn parse_with(s: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, fmt)
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, fmt).ok()?.and_hms_opt(0, 0, 0))
}

/// Try RFC 3339 first (keeping the wall-clock time), then the common patterns.
pub fn parse_date_auto(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
