//! Terminal UI layer for RFV segmentation.
//!
//! Provides themes, the graded customer table, per-metric histograms, the
//! quartile / action summary and the tabbed application event loop built on
//! top of [`ratatui`].

pub mod app;
pub mod histogram_view;
pub mod summary_view;
pub mod table_view;
pub mod themes;

pub use rfv_core as core;
