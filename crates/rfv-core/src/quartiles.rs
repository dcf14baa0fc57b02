use serde::{Deserialize, Serialize};

use crate::error::{Result, RfvError};
use crate::models::{CustomerMetrics, Grade, GradeDirection, Metric, RfvGrades};

// ── Quantile helper ───────────────────────────────────────────────────────────

/// Compute the `q`-quantile (`0.0..=1.0`) of a **sorted** slice using linear
/// interpolation between order statistics at position `q * (n - 1)`.
///
/// Returns `0.0` for an empty slice.
pub fn quantile(sorted_data: &[f64], q: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let len = sorted_data.len();
    if len == 1 {
        return sorted_data[0];
    }
    let rank = q.clamp(0.0, 1.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted_data[lo];
    }
    let frac = rank - lo as f64;
    sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo])
}

// ── QuartileBoundaries ────────────────────────────────────────────────────────

/// The 0.25 / 0.50 / 0.75 quantiles of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuartileBoundaries {
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
}

impl QuartileBoundaries {
    /// Compute boundaries over an unsorted population. `None` when empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            q25: quantile(&sorted, 0.25),
            q50: quantile(&sorted, 0.50),
            q75: quantile(&sorted, 0.75),
        })
    }
}

/// Grade a value where smaller is better (recency).
pub fn grade_lower_is_better(x: f64, b: &QuartileBoundaries) -> Grade {
    if x <= b.q25 {
        Grade::A
    } else if x <= b.q50 {
        Grade::B
    } else if x <= b.q75 {
        Grade::C
    } else {
        Grade::D
    }
}

/// Grade a value where larger is better (frequency, value).
pub fn grade_higher_is_better(x: f64, b: &QuartileBoundaries) -> Grade {
    if x <= b.q25 {
        Grade::D
    } else if x <= b.q50 {
        Grade::C
    } else if x <= b.q75 {
        Grade::B
    } else {
        Grade::A
    }
}

// ── QuartileTable ─────────────────────────────────────────────────────────────

/// Quartile boundaries for all three metrics, computed once over the whole
/// customer population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuartileTable {
    pub recency: QuartileBoundaries,
    pub frequency: QuartileBoundaries,
    pub value: QuartileBoundaries,
}

impl QuartileTable {
    /// Build the table from the aggregated customer metrics.
    ///
    /// Fails with [`RfvError::InsufficientData`] when `customers` is empty.
    pub fn compute(customers: &[CustomerMetrics]) -> Result<Self> {
        let boundaries = |metric: Metric| {
            let values: Vec<f64> = customers.iter().map(|c| c.get(metric)).collect();
            QuartileBoundaries::from_values(&values).ok_or(RfvError::InsufficientData)
        };

        Ok(Self {
            recency: boundaries(Metric::Recency)?,
            frequency: boundaries(Metric::Frequency)?,
            value: boundaries(Metric::Value)?,
        })
    }

    pub fn boundaries(&self, metric: Metric) -> &QuartileBoundaries {
        match metric {
            Metric::Recency => &self.recency,
            Metric::Frequency => &self.frequency,
            Metric::Value => &self.value,
        }
    }

    /// Grade `x` against the precomputed boundaries of `metric`.
    pub fn grade(&self, metric: Metric, x: f64) -> Grade {
        let b = self.boundaries(metric);
        match metric.direction() {
            GradeDirection::LowerIsBetter => grade_lower_is_better(x, b),
            GradeDirection::HigherIsBetter => grade_higher_is_better(x, b),
        }
    }
}

// ── QuartileClassifier ────────────────────────────────────────────────────────

/// Grades customers against a fixed [`QuartileTable`].
pub struct QuartileClassifier {
    table: QuartileTable,
}

impl QuartileClassifier {
    /// Wrap an already computed table.
    pub fn new(table: QuartileTable) -> Self {
        Self { table }
    }

    /// Compute the table over `customers` and wrap it.
    pub fn fit(customers: &[CustomerMetrics]) -> Result<Self> {
        QuartileTable::compute(customers).map(Self::new)
    }

    pub fn table(&self) -> &QuartileTable {
        &self.table
    }

    /// Grade one customer. Pure: never touches the boundaries.
    pub fn classify(&self, customer: &CustomerMetrics) -> RfvGrades {
        RfvGrades {
            recency: self.table.grade(Metric::Recency, customer.get(Metric::Recency)),
            frequency: self
                .table
                .grade(Metric::Frequency, customer.get(Metric::Frequency)),
            value: self.table.grade(Metric::Value, customer.get(Metric::Value)),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
