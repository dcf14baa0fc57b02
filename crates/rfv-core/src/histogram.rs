//! Equal-width histogram binning for the RFV metric distributions.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RfvError};
use crate::models::Metric;

/// Number of bins used when the caller does not ask for another count.
pub const DEFAULT_BINS: usize = 20;

/// One histogram bucket covering `[lower, upper)`; the last bucket is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

/// Distribution of one metric across the customer population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub metric: Metric,
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    /// Bucket `values` into `bins` equal-width bins spanning min..=max.
    ///
    /// A degenerate range (all values equal) is widened to `[v - 0.5, v + 0.5]`.
    pub fn compute(metric: Metric, values: &[f64], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(RfvError::Config(
                "histogram bin count must be at least 1".to_string(),
            ));
        }

        let (mut lo, mut hi) = values
            .iter()
            .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0.0, 1.0));
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let mut out: Vec<HistogramBin> = (0..bins)
            .map(|i| HistogramBin {
                lower: lo + width * i as f64,
                upper: if i + 1 == bins {
                    hi
                } else {
                    lo + width * (i + 1) as f64
                },
                count: 0,
            })
            .collect();

        for &v in values {
            let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
            out[idx].count += 1;
        }

        Ok(Self { metric, bins: out })
    }

    /// Total number of values bucketed.
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }

    /// Count in the fullest bin (0 when empty).
    pub fn max_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }
}
