// crates/hcp-core/src/stats.rs
//
// Per-benchmark ledger statistics, computed in one pass.
//
// Stores feed every row of a single consistent snapshot through one
// `StatsAccumulator`, so the four counts and the average always describe
// the same set of rows. The average follows SQL `AVG` semantics: rows with
// no latency are skipped, status is not consulted, and an empty input
// yields 0 rather than NaN.

use serde::{Deserialize, Serialize};

use crate::transaction::{Transaction, TransactionStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total: u64,
    pub pending_count: u64,
    pub confirmed_count: u64,
    pub failed_count: u64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct StatsAccumulator {
    total: u64,
    pending: u64,
    confirmed: u64,
    failed: u64,
    latency_sum: f64,
    latency_rows: u64,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, tx: &Transaction) {
        self.total += 1;
        match tx.status {
            TransactionStatus::Pending => self.pending += 1,
            TransactionStatus::Confirmed => self.confirmed += 1,
            TransactionStatus::Failed => self.failed += 1,
        }
        if let Some(latency) = tx.latency_ms {
            self.latency_sum += latency;
            self.latency_rows += 1;
        }
    }

    pub fn finish(self) -> TransactionStats {
        let avg_latency_ms = if self.latency_rows == 0 {
            0.0
        } else {
            self.latency_sum / self.latency_rows as f64
        };
        TransactionStats {
            total: self.total,
            pending_count: self.pending,
            confirmed_count: self.confirmed,
            failed_count: self.failed,
            avg_latency_ms,
        }
    }
}

impl<'a> FromIterator<&'a Transaction> for TransactionStats {
    fn from_iter<I: IntoIterator<Item = &'a Transaction>>(rows: I) -> Self {
        let mut acc = StatsAccumulator::new();
        for tx in rows {
            acc.observe(tx);
        }
        acc.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn tx(status: TransactionStatus, latency: Option<f64>) -> Transaction {
        let mut t = Transaction::pending(Uuid::now_v7(), "0xa", "0xb", 1);
        t.status = status;
        t.latency_ms = latency;
        t
    }

    #[test]
    fn test_empty_is_all_zero() {
        let stats: TransactionStats = std::iter::empty::<&Transaction>().collect();
        assert_eq!(stats, TransactionStats::default());
        assert_eq!(stats.avg_latency_ms, 0.0);
    }

    #[test]
    fn test_mixed_statuses() {
        let mut rows: Vec<Transaction> = (1..=7)
            .map(|i| tx(TransactionStatus::Confirmed, Some(i as f64 * 10.0)))
            .collect();
        rows.push(tx(TransactionStatus::Pending, None));
        rows.push(tx(TransactionStatus::Pending, None));
        rows.push(tx(TransactionStatus::Failed, None));

        let stats: TransactionStats = rows.iter().collect();
        assert_eq!(stats.total, 10);
        assert_eq!(stats.pending_count, 2);
        assert_eq!(stats.confirmed_count, 7);
        assert_eq!(stats.failed_count, 1);
        assert!((stats.avg_latency_ms - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_does_not_filter_by_status() {
        let rows = [
            tx(TransactionStatus::Confirmed, Some(10.0)),
            tx(TransactionStatus::Failed, Some(30.0)),
        ];
        let stats: TransactionStats = rows.iter().collect();
        assert!((stats.avg_latency_ms - 20.0).abs() < 1e-9);
    }
}
