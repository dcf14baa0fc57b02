use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::actions::ActionTable;
use crate::error::Result;
use crate::schema::ColumnSchema;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// RFV (recency, frequency, value) customer segmentation
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rfv-segment",
    about = "RFV (recency, frequency, value) customer segmentation",
    version
)]
pub struct Settings {
    /// Transaction table to segment (.csv, .xlsx, .xls or .ods)
    #[arg(required_unless_present = "clear")]
    pub input: Option<PathBuf>,

    /// JSON file mapping logical fields to column names
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Column holding the customer identifier
    #[arg(long)]
    pub customer_column: Option<String>,

    /// Column holding the purchase date
    #[arg(long)]
    pub date_column: Option<String>,

    /// Column holding the purchase identifier
    #[arg(long)]
    pub purchase_column: Option<String>,

    /// Column holding the purchase total
    #[arg(long)]
    pub value_column: Option<String>,

    /// Explicit chrono format for purchase dates (e.g. "%d/%m/%Y")
    #[arg(long)]
    pub date_format: Option<String>,

    /// Worksheet to read from a workbook (first sheet if omitted)
    #[arg(long)]
    pub sheet: Option<String>,

    /// JSON file mapping scores to marketing actions (replaces the defaults)
    #[arg(long)]
    pub actions: Option<PathBuf>,

    /// Histogram bin count per metric (1-200)
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u32).range(1..=200))]
    pub bins: u32,

    /// Write the graded table to this path (.csv or .xlsx). Nothing is written otherwise.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// How to show the result
    #[arg(long, default_value = "interactive", value_parser = ["interactive", "summary"])]
    pub view: String,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path (logs go to stderr otherwise)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved preferences
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Display preferences remembered in `~/.rfv-segment/last_used.json`.
///
/// Input and output paths are never remembered.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins: Option<u32>,
}

impl LastUsedParams {
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".rfv-segment").join("last_used.json")
    }

    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(
                "Ignoring unreadable preferences at {}: {}",
                path.display(),
                e
            );
            Self::default()
        })
    }

    /// Write via a temp file and rename, creating parent directories.
    pub fn save_to(&self, path: &Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)
    }

    pub fn clear_at(path: &Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            theme: Some(s.theme.clone()),
            view: Some(s.view.clone()),
            bins: Some(s.bins),
        }
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments and merge remembered preferences.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Parse `args`, fill flags not given on the command line from the file at
    /// `config_path`, then persist the merged preferences back to it.
    pub fn load_with_last_used_impl(args: Vec<std::ffi::OsString>, config_path: &Path) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return settings.apply_debug();
        }

        let last = LastUsedParams::load_from(config_path);

        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "bins") {
            if let Some(v) = last.bins.filter(|b| (1..=200).contains(b)) {
                settings.bins = v;
            }
        }

        settings = settings.apply_debug();

        let _ = LastUsedParams::from(&settings).save_to(config_path);
        settings
    }

    fn apply_debug(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }

    /// The input schema: schema file (or defaults) with per-column overrides.
    pub fn column_schema(&self) -> Result<ColumnSchema> {
        let mut schema = match &self.schema {
            Some(path) => ColumnSchema::load_from(path)?,
            None => ColumnSchema::default(),
        };
        if let Some(c) = &self.customer_column {
            schema.customer_id = c.clone();
        }
        if let Some(c) = &self.date_column {
            schema.purchase_date = c.clone();
        }
        if let Some(c) = &self.purchase_column {
            schema.purchase_code = c.clone();
        }
        if let Some(c) = &self.value_column {
            schema.total_value = c.clone();
        }
        if let Some(f) = &self.date_format {
            schema.date_format = Some(f.clone());
        }
        schema.validate()?;
        Ok(schema)
    }

    /// The action table from `--actions`, or the curated defaults.
    pub fn action_table(&self) -> Result<ActionTable> {
        match &self.actions {
            Some(path) => ActionTable::load_from(path),
            None => Ok(ActionTable::default()),
        }
    }
}

/// `true` when `name` was supplied on the command line (not a default).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RfvError;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            theme: Some("dark".to_string()),
            view: Some("summary".to_string()),
            bins: Some(30),
        };
        params.save_to(&path).expect("save");
        assert_eq!(LastUsedParams::load_from(&path), params);
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists());

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_last_used_params_default_when_missing_or_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        assert_eq!(LastUsedParams::load_from(&path), LastUsedParams::default());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(LastUsedParams::load_from(&path), LastUsedParams::default());
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["rfv-segment", "compras.csv"]);
        assert_eq!(settings.input, Some(PathBuf::from("compras.csv")));
        assert_eq!(settings.bins, 20);
        assert_eq!(settings.view, "interactive");
        assert_eq!(settings.theme, "auto");
        assert_eq!(settings.log_level, "INFO");
        assert!(settings.output.is_none());
        assert!(settings.schema.is_none());
        assert!(!settings.debug);
        assert!(!settings.clear);
    }

    #[test]
    fn test_settings_input_required_unless_clear() {
        assert!(Settings::try_parse_from(["rfv-segment"]).is_err());
        let settings = Settings::try_parse_from(["rfv-segment", "--clear"]).unwrap();
        assert!(settings.input.is_none());
    }

    #[test]
    fn test_settings_bins_range() {
        assert!(Settings::try_parse_from(["rfv-segment", "a.csv", "--bins", "0"]).is_err());
        assert!(Settings::try_parse_from(["rfv-segment", "a.csv", "--bins", "201"]).is_err());
        let s = Settings::try_parse_from(["rfv-segment", "a.csv", "--bins", "50"]).unwrap();
        assert_eq!(s.bins, 50);
    }

    #[test]
    fn test_column_schema_overrides() {
        let settings = Settings::parse_from([
            "rfv-segment",
            "a.csv",
            "--customer-column",
            "customer",
            "--date-format",
            "%d/%m/%Y",
        ]);
        let schema = settings.column_schema().unwrap();
        assert_eq!(schema.customer_id, "customer");
        assert_eq!(schema.purchase_date, "DiaCompra");
        assert_eq!(schema.date_format.as_deref(), Some("%d/%m/%Y"));
    }

    #[test]
    fn test_column_schema_file_then_flags() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("schema.json");
        std::fs::write(&path, r#"{"customer_id": "cid", "total_value": "amount"}"#).unwrap();

        let args: Vec<std::ffi::OsString> = vec![
            "rfv-segment".into(),
            "a.csv".into(),
            "--schema".into(),
            path.into_os_string(),
            "--value-column".into(),
            "total".into(),
        ];
        let settings = Settings::parse_from(args);
        let schema = settings.column_schema().unwrap();
        assert_eq!(schema.customer_id, "cid");
        assert_eq!(schema.total_value, "total");
    }

    #[test]
    fn test_column_schema_rejects_duplicate_override() {
        let settings = Settings::parse_from([
            "rfv-segment",
            "a.csv",
            "--value-column",
            "ID_cliente",
        ]);
        assert!(matches!(settings.column_schema(), Err(RfvError::Config(_))));
    }

    #[test]
    fn test_action_table_default() {
        let settings = Settings::parse_from(["rfv-segment", "a.csv"]);
        assert_eq!(settings.action_table().unwrap(), ActionTable::default());
    }

    #[test]
    fn test_load_with_last_used_merges_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            theme: Some("dark".to_string()),
            view: Some("summary".to_string()),
            bins: Some(40),
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec!["rfv-segment".into(), "a.csv".into()],
            &config_path,
        );
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.view, "summary");
        assert_eq!(settings.bins, 40);
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            theme: Some("dark".to_string()),
            bins: Some(40),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec![
                "rfv-segment".into(),
                "a.csv".into(),
                "--theme".into(),
                "light".into(),
                "--bins".into(),
                "10".into(),
            ],
            &config_path,
        );
        assert_eq!(settings.theme, "light");
        assert_eq!(settings.bins, 10);
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams::default()
            .save_to(&config_path)
            .expect("save");

        Settings::load_with_last_used_impl(
            vec!["rfv-segment".into(), "--clear".into()],
            &config_path,
        );
        assert!(!config_path.exists());
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let settings = Settings::load_with_last_used_impl(
            vec!["rfv-segment".into(), "a.csv".into(), "--debug".into()],
            &tmp_config_path(&tmp),
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_never_persists_paths() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        Settings::load_with_last_used_impl(
            vec![
                "rfv-segment".into(),
                "a.csv".into(),
                "--output".into(),
                "out.xlsx".into(),
            ],
            &config_path,
        );
        let content = std::fs::read_to_string(&config_path).expect("persisted");
        assert!(!content.contains("out.xlsx"));
        assert!(!content.contains("a.csv"));
    }
}
