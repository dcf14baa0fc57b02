//! Per-customer reduction of the transaction table.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rfv_core::error::{Result, RfvError};
use rfv_core::models::{CustomerMetrics, Transaction};
use tracing::debug;

// ── CustomerTotals ────────────────────────────────────────────────────────────

/// Running totals for one customer while the transactions are scanned.
#[derive(Debug, Clone)]
struct CustomerTotals {
    last_purchase: NaiveDateTime,
    count: u64,
    value: f64,
}

impl CustomerTotals {
    fn new(tx: &Transaction) -> Self {
        Self {
            last_purchase: tx.purchase_date,
            count: 1,
            value: tx.total_value,
        }
    }

    fn add(&mut self, tx: &Transaction) {
        self.last_purchase = self.last_purchase.max(tx.purchase_date);
        self.count += 1;
        self.value += tx.total_value;
    }
}

// ── CustomerAggregator ────────────────────────────────────────────────────────

/// Reduces purchases into one [`CustomerMetrics`] row per customer.
pub struct CustomerAggregator;

impl CustomerAggregator {
    /// Latest purchase date in the whole set, the "today" recency is measured
    /// against. `None` for an empty slice.
    pub fn reference_date(transactions: &[Transaction]) -> Option<NaiveDateTime> {
        transactions.iter().map(|t| t.purchase_date).max()
    }

    /// Group by customer id and derive recency, frequency and value.
    ///
    /// Recency is the number of whole days from the customer's last purchase
    /// to [`reference_date`](Self::reference_date). Output is ordered by
    /// customer id.
    pub fn aggregate(transactions: &[Transaction]) -> Result<Vec<CustomerMetrics>> {
        let reference = Self::reference_date(transactions).ok_or(RfvError::EmptyInput)?;

        let mut groups: BTreeMap<&str, CustomerTotals> = BTreeMap::new();
        for tx in transactions {
            groups
                .entry(tx.customer_id.as_str())
                .and_modify(|totals| totals.add(tx))
                .or_insert_with(|| CustomerTotals::new(tx));
        }

        let customers: Vec<CustomerMetrics> = groups
            .into_iter()
            .map(|(id, totals)| CustomerMetrics {
                customer_id: id.to_string(),
                recency: (reference - totals.last_purchase).num_days(),
                frequency: totals.count,
                value: totals.value,
            })
            .collect();

        debug!(
            "Aggregated {} transactions into {} customers (reference date {})",
            transactions.len(),
            customers.len(),
            reference
        );
        Ok(customers)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
