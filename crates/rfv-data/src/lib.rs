//! Data layer for RFV segmentation.
//!
//! Reads transaction tables, reduces them to per-customer metrics, grades and
//! annotates customers, renders export buffers and runs the top-level
//! analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod cache;
pub mod export;
pub mod reader;
pub mod segments;

pub use rfv_core as core;
