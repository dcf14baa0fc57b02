//! Serialization of the graded table into downloadable buffers.
//!
//! Rendering is pure: [`to_csv_bytes`] and [`to_xlsx_bytes`] only build
//! in-memory buffers. Touching the filesystem is opt-in through an
//! [`ExportDestination`] configured with an explicit path.

use std::path::{Path, PathBuf};

use rfv_core::error::{Result, RfvError};
use rfv_core::models::{Grade, GradedCustomer};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Column headers of both export formats, in order.
pub const EXPORT_COLUMNS: [&str; 9] = [
    "customer_id",
    "recency",
    "frequency",
    "value",
    "r_grade",
    "f_grade",
    "v_grade",
    "score",
    "action",
];

/// Name of the single worksheet in the spreadsheet export.
pub const SHEET_NAME: &str = "Sheet1";

// ── ExportFormat ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// `.csv` or `.xlsx`, case-insensitive.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => Ok(ExportFormat::Csv),
            Some("xlsx") => Ok(ExportFormat::Xlsx),
            _ => Err(RfvError::Config(format!(
                "cannot export to {}: use a .csv or .xlsx file name",
                path.display()
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    /// Render `graded` in this format.
    pub fn render(&self, graded: &[GradedCustomer]) -> Result<Vec<u8>> {
        match self {
            ExportFormat::Csv => to_csv_bytes(graded),
            ExportFormat::Xlsx => to_xlsx_bytes(graded),
        }
    }
}

// ── ExportRow ─────────────────────────────────────────────────────────────────

/// Flat, one-line-per-customer view of a [`GradedCustomer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub customer_id: String,
    pub recency: i64,
    pub frequency: u64,
    pub value: f64,
    pub r_grade: Grade,
    pub f_grade: Grade,
    pub v_grade: Grade,
    pub score: String,
    pub action: Option<String>,
}

impl From<&GradedCustomer> for ExportRow {
    fn from(c: &GradedCustomer) -> Self {
        Self {
            customer_id: c.metrics.customer_id.clone(),
            recency: c.metrics.recency,
            frequency: c.metrics.frequency,
            value: c.metrics.value,
            r_grade: c.grades.recency,
            f_grade: c.grades.frequency,
            v_grade: c.grades.value,
            score: c.score.clone(),
            action: c.action.clone(),
        }
    }
}

// ── Delimited text ────────────────────────────────────────────────────────────

/// UTF-8 comma-separated export with a header row.
pub fn to_csv_bytes(graded: &[GradedCustomer]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for customer in graded {
        writer
            .serialize(ExportRow::from(customer))
            .map_err(|e| RfvError::Export(e.to_string()))?;
    }
    // An empty table still gets its header.
    if graded.is_empty() {
        writer
            .write_record(EXPORT_COLUMNS)
            .map_err(|e| RfvError::Export(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| RfvError::Export(e.to_string()))?;
    debug!("Rendered CSV export: {} rows, {} bytes", graded.len(), bytes.len());
    Ok(bytes)
}

/// Parse a buffer produced by [`to_csv_bytes`].
pub fn read_csv_export(bytes: &[u8]) -> Result<Vec<ExportRow>> {
    csv::Reader::from_reader(bytes)
        .deserialize()
        .collect::<std::result::Result<Vec<ExportRow>, _>>()
        .map_err(|e| RfvError::InputFormat(e.to_string()))
}

// ── Spreadsheet ───────────────────────────────────────────────────────────────

fn xlsx_error(e: XlsxError) -> RfvError {
    RfvError::Export(e.to_string())
}

/// Single-sheet `.xlsx` workbook with a bold header row.
pub fn to_xlsx_bytes(graded: &[GradedCustomer]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(xlsx_error)?;

    for (col, name) in EXPORT_COLUMNS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *name, &header)
            .map_err(xlsx_error)?;
    }

    for (i, customer) in graded.iter().enumerate() {
        let row = i as u32 + 1;
        let r = ExportRow::from(customer);
        sheet.write_string(row, 0, &r.customer_id).map_err(xlsx_error)?;
        sheet.write_number(row, 1, r.recency as f64).map_err(xlsx_error)?;
        sheet.write_number(row, 2, r.frequency as f64).map_err(xlsx_error)?;
        sheet.write_number(row, 3, r.value).map_err(xlsx_error)?;
        sheet
            .write_string(row, 4, r.r_grade.to_string())
            .map_err(xlsx_error)?;
        sheet
            .write_string(row, 5, r.f_grade.to_string())
            .map_err(xlsx_error)?;
        sheet
            .write_string(row, 6, r.v_grade.to_string())
            .map_err(xlsx_error)?;
        sheet.write_string(row, 7, &r.score).map_err(xlsx_error)?;
        if let Some(action) = &r.action {
            sheet.write_string(row, 8, action).map_err(xlsx_error)?;
        }
    }

    let bytes = workbook.save_to_buffer().map_err(xlsx_error)?;
    debug!("Rendered XLSX export: {} rows, {} bytes", graded.len(), bytes.len());
    Ok(bytes)
}

// ── ExportDestination ─────────────────────────────────────────────────────────

/// Where, if anywhere, the export is persisted. Defaults to nowhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportDestination {
    path: Option<PathBuf>,
}

impl ExportDestination {
    pub fn none() -> Self {
        Self::default()
    }

    /// Persist to `path`; the format follows its extension.
    pub fn to_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ExportFormat::from_path(&path)?;
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Format implied by the configured path.
    pub fn format(&self) -> Option<ExportFormat> {
        self.path
            .as_deref()
            .and_then(|p| ExportFormat::from_path(p).ok())
    }

    /// Render and write `graded`. Returns the written path, or `None` when
    /// no destination is configured.
    pub fn write(&self, graded: &[GradedCustomer]) -> Result<Option<PathBuf>> {
        let Some(path) = &self.path else {
            debug!("No export destination configured, skipping write");
            return Ok(None);
        };
        let bytes = ExportFormat::from_path(path)?.render(graded)?;
        self.write_bytes(&bytes)
    }

    /// Write an already rendered buffer.
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<Option<PathBuf>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        std::fs::write(path, bytes).map_err(|source| RfvError::FileWrite {
            path: path.clone(),
            source,
        })?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(Some(path.clone()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
