use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single purchase row read from the uploaded transaction table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Customer identifier as it appears in the source table.
    pub customer_id: String,
    /// When the purchase happened. Date-only inputs land at midnight.
    pub purchase_date: NaiveDateTime,
    /// Purchase (order) identifier.
    pub purchase_code: String,
    /// Monetary amount of the purchase.
    pub total_value: f64,
}

/// Per-customer recency, frequency and value derived from the transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMetrics {
    /// Unique customer key.
    pub customer_id: String,
    /// Whole days between the customer's last purchase and the latest purchase
    /// in the whole dataset.
    pub recency: i64,
    /// Number of transaction rows for the customer.
    pub frequency: u64,
    /// Sum of `total_value` across the customer's transactions.
    pub value: f64,
}

impl CustomerMetrics {
    /// The value of `metric` for this customer as a float.
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Recency => self.recency as f64,
            Metric::Frequency => self.frequency as f64,
            Metric::Value => self.value,
        }
    }
}

/// Whether smaller or larger metric values earn the better grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeDirection {
    LowerIsBetter,
    HigherIsBetter,
}

/// One of the three RFV dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Recency,
    Frequency,
    Value,
}

impl Metric {
    /// All metrics in score order (R, F, V).
    pub const ALL: [Metric; 3] = [Metric::Recency, Metric::Frequency, Metric::Value];

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Recency => "Recency",
            Metric::Frequency => "Frequency",
            Metric::Value => "Value",
        }
    }

    /// Recency rewards small values, frequency and value reward large ones.
    pub fn direction(&self) -> GradeDirection {
        match self {
            Metric::Recency => GradeDirection::LowerIsBetter,
            Metric::Frequency | Metric::Value => GradeDirection::HigherIsBetter,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Quartile grade. `A` is always the best quartile, `D` the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn as_char(&self) -> char {
        match self {
            Grade::A => 'A',
            Grade::B => 'B',
            Grade::C => 'C',
            Grade::D => 'D',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(Grade::A),
            'B' => Some(Grade::B),
            'C' => Some(Grade::C),
            'D' => Some(Grade::D),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// The three grades of one customer, in R, F, V order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RfvGrades {
    pub recency: Grade,
    pub frequency: Grade,
    pub value: Grade,
}

impl RfvGrades {
    /// The 3-letter score, e.g. `"ABD"`.
    pub fn score(&self) -> String {
        [self.recency, self.frequency, self.value]
            .iter()
            .map(Grade::as_char)
            .collect()
    }

    /// Parse a 3-letter score back into grades. Returns `None` unless the
    /// string is exactly three characters drawn from `A`-`D`.
    pub fn parse_score(score: &str) -> Option<Self> {
        let mut chars = score.chars();
        let recency = Grade::from_char(chars.next()?)?;
        let frequency = Grade::from_char(chars.next()?)?;
        let value = Grade::from_char(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Self {
            recency,
            frequency,
            value,
        })
    }
}

/// A customer row after classification and action lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedCustomer {
    pub metrics: CustomerMetrics,
    pub grades: RfvGrades,
    /// `r_grade + f_grade + v_grade`.
    pub score: String,
    /// Curated marketing action, `None` for uncurated scores.
    pub action: Option<String>,
}

impl GradedCustomer {
    pub fn new(metrics: CustomerMetrics, grades: RfvGrades, action: Option<String>) -> Self {
        Self {
            score: grades.score(),
            metrics,
            grades,
            action,
        }
    }

    pub fn customer_id(&self) -> &str {
        &self.metrics.customer_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> CustomerMetrics {
        CustomerMetrics {
            customer_id: "C1".to_string(),
            recency: 5,
            frequency: 10,
            value: 1000.0,
        }
    }

    #[test]
    fn test_metric_get() {
        let m = metrics();
        assert_eq!(m.get(Metric::Recency), 5.0);
        assert_eq!(m.get(Metric::Frequency), 10.0);
        assert_eq!(m.get(Metric::Value), 1000.0);
    }

    #[test]
    fn test_metric_directions() {
        assert_eq!(Metric::Recency.direction(), GradeDirection::LowerIsBetter);
        assert_eq!(Metric::Frequency.direction(), GradeDirection::HigherIsBetter);
        assert_eq!(Metric::Value.direction(), GradeDirection::HigherIsBetter);
    }

    #[test]
    fn test_score_concatenates_in_rfv_order() {
        let grades = RfvGrades {
            recency: Grade::A,
            frequency: Grade::B,
            value: Grade::C,
        };
        assert_eq!(grades.score(), "ABC");
    }

    #[test]
    fn test_parse_score() {
        let grades = RfvGrades::parse_score("DAA").unwrap();
        assert_eq!(grades.recency, Grade::D);
        assert_eq!(grades.frequency, Grade::A);
        assert_eq!(grades.value, Grade::A);

        assert!(RfvGrades::parse_score("AA").is_none());
        assert!(RfvGrades::parse_score("AAAA").is_none());
        assert!(RfvGrades::parse_score("AEA").is_none());
        assert!(RfvGrades::parse_score("aaa").is_none());
    }

    #[test]
    fn test_graded_customer_new_sets_score() {
        let grades = RfvGrades {
            recency: Grade::C,
            frequency: Grade::A,
            value: Grade::A,
        };
        let graded = GradedCustomer::new(metrics(), grades, None);
        assert_eq!(graded.score, "CAA");
        assert_eq!(graded.customer_id(), "C1");
        assert!(graded.action.is_none());
    }
}
