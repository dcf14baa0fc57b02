//! Memoized export rendering keyed by the graded table's content hash.

use std::collections::HashMap;

use rfv_core::error::Result;
use rfv_core::models::GradedCustomer;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::export::ExportFormat;

/// SHA-256 (hex) of the table's JSON serialization.
///
/// Two tables hash equal exactly when they serialize identically, so any
/// change to a metric, grade or action produces a new key.
pub fn content_hash(table: &[GradedCustomer]) -> Result<String> {
    let canonical = serde_json::to_vec(table)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}

/// Remembers rendered export buffers so repeated requests for the same
/// table and format skip re-rendering.
#[derive(Debug, Default)]
pub struct ExportCache {
    entries: HashMap<(String, ExportFormat), Vec<u8>>,
    hits: u64,
    misses: u64,
}

impl ExportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached buffer for `(table, format)`, rendering it on first use.
    pub fn get_or_render(&mut self, table: &[GradedCustomer], format: ExportFormat) -> Result<&[u8]> {
        let key = (content_hash(table)?, format);
        if self.entries.contains_key(&key) {
            self.hits += 1;
            debug!("Export cache hit for {:?} {}", format, &key.0[..12]);
        } else {
            self.misses += 1;
            debug!("Export cache miss for {:?} {}", format, &key.0[..12]);
            let bytes = format.render(table)?;
            self.entries.insert(key.clone(), bytes);
        }
        Ok(self.entries.get(&key).map(Vec::as_slice).unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation or the last [`clear`](Self::clear).
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
