//! End-to-end RFV pipeline.
//!
//! Orchestrates ingestion, aggregation, quartile classification and segment
//! reporting, returning an [`RfvReport`] ready for the UI layer or for export.
//! Every failure surfaces before a report exists; there are no partial results.

use std::path::Path;
use std::time::Instant;

use chrono::{NaiveDateTime, Utc};
use rfv_core::actions::ActionTable;
use rfv_core::error::{Result, RfvError};
use rfv_core::histogram::{Histogram, DEFAULT_BINS};
use rfv_core::models::{GradedCustomer, Metric, Transaction};
use rfv_core::quartiles::{QuartileClassifier, QuartileTable};
use rfv_core::schema::ColumnSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregator::CustomerAggregator;
use crate::reader::{load_transactions, read_transactions, InputFormat};
use crate::segments::{ActionCount, SegmentCount, SegmentReporter};

// ── Public types ──────────────────────────────────────────────────────────────

/// Knobs of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Histogram bins per metric.
    pub bins: usize,
    /// Score → action mapping used by the reporter.
    pub actions: ActionTable,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            actions: ActionTable::default(),
        }
    }
}

/// Metadata produced alongside the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this report was generated.
    pub generated_at: String,
    /// Number of [`Transaction`] rows processed.
    pub transactions_processed: usize,
    /// Number of distinct customers.
    pub customers: usize,
    /// Number of distinct scores among those customers.
    pub distinct_scores: usize,
    /// Customers whose score has a curated action.
    pub customers_with_action: usize,
    /// Wall-clock seconds spent reading the input, zero when the
    /// transactions were supplied directly.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent aggregating, classifying and reporting.
    pub transform_time_seconds: f64,
}

/// The complete output of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfvReport {
    /// Latest purchase in the input; recency is measured from here.
    pub reference_date: NaiveDateTime,
    /// Quartile boundaries per metric.
    pub quartiles: QuartileTable,
    /// The annotated table, ordered by customer id.
    pub customers: Vec<GradedCustomer>,
    pub segment_counts: Vec<SegmentCount>,
    pub action_counts: Vec<ActionCount>,
    /// Recency, frequency and value distributions, in that order.
    pub histograms: Vec<Histogram>,
    pub metadata: AnalysisMetadata,
}

impl RfvReport {
    /// Histogram of `metric`, if present.
    pub fn histogram(&self, metric: Metric) -> Option<&Histogram> {
        self.histograms.iter().find(|h| h.metric == metric)
    }

    /// Graded row of `customer_id`.
    pub fn customer(&self, customer_id: &str) -> Option<&GradedCustomer> {
        self.customers
            .binary_search_by(|c| c.customer_id().cmp(customer_id))
            .ok()
            .map(|i| &self.customers[i])
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run aggregation, classification and reporting over loaded transactions.
///
/// 1. Reduce transactions to per-customer metrics.
/// 2. Compute the quartile table once over the population.
/// 3. Grade every customer against that table and attach actions.
/// 4. Tally segments and actions, bin the metric distributions.
pub fn run_pipeline(transactions: &[Transaction], options: &PipelineOptions) -> Result<RfvReport> {
    if options.bins == 0 {
        return Err(RfvError::Config(
            "histogram bin count must be at least 1".to_string(),
        ));
    }
    let start = Instant::now();

    // ── Step 1: Aggregate ─────────────────────────────────────────────────────
    let reference_date =
        CustomerAggregator::reference_date(transactions).ok_or(RfvError::EmptyInput)?;
    let customers = CustomerAggregator::aggregate(transactions)?;

    // ── Step 2: Quartiles ─────────────────────────────────────────────────────
    let classifier = QuartileClassifier::fit(&customers)?;
    debug!("Quartile table: {:?}", classifier.table());

    // ── Step 3: Grade ─────────────────────────────────────────────────────────
    let reporter = SegmentReporter::new(options.actions.clone());
    let graded = reporter.annotate(&classifier, customers);

    // ── Step 4: Summaries ─────────────────────────────────────────────────────
    let segment_counts = reporter.segment_counts(&graded);
    let action_counts = reporter.action_counts(&graded);
    let histograms = reporter.histograms(&graded, options.bins)?;

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        transactions_processed: transactions.len(),
        customers: graded.len(),
        distinct_scores: segment_counts.len(),
        customers_with_action: graded.iter().filter(|c| c.action.is_some()).count(),
        load_time_seconds: 0.0,
        transform_time_seconds: start.elapsed().as_secs_f64(),
    };
    info!(
        "Segmented {} customers from {} transactions into {} scores",
        metadata.customers, metadata.transactions_processed, metadata.distinct_scores
    );

    Ok(RfvReport {
        reference_date,
        quartiles: classifier.table().clone(),
        customers: graded,
        segment_counts,
        action_counts,
        histograms,
        metadata,
    })
}

/// Parse an in-memory upload and run the pipeline on it.
pub fn analyze_bytes(
    bytes: &[u8],
    format: InputFormat,
    schema: &ColumnSchema,
    sheet: Option<&str>,
    options: &PipelineOptions,
) -> Result<RfvReport> {
    let load_start = Instant::now();
    let transactions = read_transactions(bytes, format, schema, sheet)?;
    let load_time = load_start.elapsed().as_secs_f64();
    with_load_time(run_pipeline(&transactions, options), load_time)
}

/// Read the file at `path` and run the pipeline on it.
pub fn analyze_file(
    path: &Path,
    schema: &ColumnSchema,
    sheet: Option<&str>,
    options: &PipelineOptions,
) -> Result<RfvReport> {
    let load_start = Instant::now();
    let transactions = load_transactions(path, schema, sheet)?;
    let load_time = load_start.elapsed().as_secs_f64();
    debug!("Loaded {} in {:.3}s", path.display(), load_time);
    with_load_time(run_pipeline(&transactions, options), load_time)
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn with_load_time(report: Result<RfvReport>, seconds: f64) -> Result<RfvReport> {
    report.map(|mut r| {
        r.metadata.load_time_seconds = seconds;
        r
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
