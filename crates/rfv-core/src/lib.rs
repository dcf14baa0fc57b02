//! Core domain layer for RFV segmentation.
//!
//! Holds the typed records, the error taxonomy, the quartile classifier,
//! the curated action table, histogram binning, the input column schema and
//! the command-line settings shared by the other crates.

pub mod actions;
pub mod error;
pub mod formatting;
pub mod histogram;
pub mod models;
pub mod quartiles;
pub mod schema;
pub mod settings;

pub use error::{Result, RfvError};
