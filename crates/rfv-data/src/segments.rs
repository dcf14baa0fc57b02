//! Score assembly, action lookup and summary tallies over the graded table.

use std::collections::BTreeMap;

use rfv_core::actions::ActionTable;
use rfv_core::error::Result;
use rfv_core::histogram::Histogram;
use rfv_core::models::{CustomerMetrics, GradedCustomer, Metric};
use rfv_core::quartiles::QuartileClassifier;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of customers sharing one score (and therefore one action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCount {
    pub score: String,
    pub action: Option<String>,
    pub customers: u64,
}

/// Number of customers receiving one action. `action == None` collects every
/// customer whose score has no curated action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCount {
    pub action: Option<String>,
    pub customers: u64,
}

// ── SegmentReporter ───────────────────────────────────────────────────────────

/// Turns classified customers into the annotated table and its summaries.
///
/// Every method is a pure function of its arguments, so summaries can be
/// recomputed from the graded table at any time.
#[derive(Debug, Clone, Default)]
pub struct SegmentReporter {
    actions: ActionTable,
}

impl SegmentReporter {
    pub fn new(actions: ActionTable) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    /// Grade every customer and attach the curated action for its score.
    pub fn annotate(
        &self,
        classifier: &QuartileClassifier,
        customers: Vec<CustomerMetrics>,
    ) -> Vec<GradedCustomer> {
        customers
            .into_iter()
            .map(|metrics| {
                let grades = classifier.classify(&metrics);
                let action = self.actions.lookup(&grades.score()).map(str::to_string);
                GradedCustomer::new(metrics, grades, action)
            })
            .collect()
    }

    /// Customers per distinct score, most populated first (ties by score).
    pub fn segment_counts(&self, graded: &[GradedCustomer]) -> Vec<SegmentCount> {
        let mut tally: BTreeMap<&str, (Option<&str>, u64)> = BTreeMap::new();
        for customer in graded {
            tally
                .entry(customer.score.as_str())
                .or_insert((customer.action.as_deref(), 0))
                .1 += 1;
        }

        let mut counts: Vec<SegmentCount> = tally
            .into_iter()
            .map(|(score, (action, customers))| SegmentCount {
                score: score.to_string(),
                action: action.map(str::to_string),
                customers,
            })
            .collect();
        // Stable sort keeps the score order among equal counts.
        counts.sort_by(|a, b| b.customers.cmp(&a.customers));
        counts
    }

    /// Customers per action, most populated first. Uncurated scores are
    /// grouped under `None`.
    pub fn action_counts(&self, graded: &[GradedCustomer]) -> Vec<ActionCount> {
        let mut tally: BTreeMap<Option<&str>, u64> = BTreeMap::new();
        for customer in graded {
            *tally.entry(customer.action.as_deref()).or_default() += 1;
        }

        let mut counts: Vec<ActionCount> = tally
            .into_iter()
            .map(|(action, customers)| ActionCount {
                action: action.map(str::to_string),
                customers,
            })
            .collect();
        counts.sort_by(|a, b| b.customers.cmp(&a.customers));
        counts
    }

    /// One histogram per metric, in R, F, V order.
    pub fn histograms(&self, graded: &[GradedCustomer], bins: usize) -> Result<Vec<Histogram>> {
        let histograms = Metric::ALL
            .iter()
            .map(|&metric| {
                let values: Vec<f64> = graded.iter().map(|c| c.metrics.get(metric)).collect();
                Histogram::compute(metric, &values, bins)
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Built {} histograms with {} bins", histograms.len(), bins);
        Ok(histograms)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
