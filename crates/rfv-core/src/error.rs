use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the RFV segmentation crates.
#[derive(Error, Debug)]
pub enum RfvError {
    /// The uploaded file could not be parsed as a table at all.
    #[error("Invalid input format: {0}")]
    InputFormat(String),

    /// A required column is absent from the header row.
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    /// The input table contains no transaction rows.
    #[error("Input contains no transactions")]
    EmptyInput,

    /// No customers were available to compute quartiles over.
    #[error("Insufficient data: at least one customer is required to compute quartiles")]
    InsufficientData,

    /// A cell in a required column could not be converted to its expected type.
    #[error("Row {row}, column {column}: cannot parse {value:?} as {expected}")]
    TypeCoercion {
        /// 1-based data row (the header row is not counted).
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },

    /// The spreadsheet writer failed to produce a workbook.
    #[error("Export failed: {0}")]
    Export(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An export destination could not be written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON configuration document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the rfv crates.
pub type Result<T> = std::result::Result<T, RfvError>;
