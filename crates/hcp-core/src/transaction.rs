// crates/hcp-core/src/transaction.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::HcpError;
use crate::metric::truncate_to_micros;
use crate::query::{eq_opt, Filter};

/// Years a ledger timestamp may fall in. Partition names carry a
/// four-digit year.
pub const SUBMITTED_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Ledger status of a transaction. `Confirmed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl FromStr for TransactionStatus {
    type Err = HcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "confirmed" => Ok(TransactionStatus::Confirmed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(HcpError::Validation(format!("unknown transaction status: {}", other))),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ledger entry submitted during a benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Globally unique.
    pub hash: String,
    pub from_address: String,
    pub to_address: String,
    /// Amount in wei.
    pub amount: i64,
    pub gas_price: i64,
    pub gas_limit: i64,
    pub gas_used: i64,
    pub nonce: i64,
    pub block_number: i64,
    pub block_hash: String,
    pub transaction_index: u32,
    pub status: TransactionStatus,
    pub error_message: Option<String>,
    /// Drives ledger partition placement.
    pub submitted_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Unset until the confirmation collaborator reports it.
    pub latency_ms: Option<f64>,
    pub benchmark_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A pending transaction submitted now. The hash is generated.
    pub fn pending(
        benchmark_id: Uuid,
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        amount: i64,
    ) -> Self {
        let now = truncate_to_micros(Utc::now());
        let mut tx = Self {
            hash: String::new(),
            from_address: from_address.into(),
            to_address: to_address.into(),
            amount,
            gas_price: 0,
            gas_limit: 0,
            gas_used: 0,
            nonce: 0,
            block_number: 0,
            block_hash: String::new(),
            transaction_index: 0,
            status: TransactionStatus::Pending,
            error_message: None,
            submitted_at: now,
            confirmed_at: None,
            latency_ms: None,
            benchmark_id,
            created_at: now,
        };
        tx.hash = generate_hash(&tx);
        tx
    }

    pub fn validate(&self) -> Result<(), HcpError> {
        if self.hash.trim().is_empty() {
            return Err(HcpError::Validation("transaction hash must not be empty".into()));
        }
        if self.benchmark_id.is_nil() {
            return Err(HcpError::Validation("transaction benchmark_id must be set".into()));
        }
        if !SUBMITTED_YEARS.contains(&self.submitted_at.year()) {
            return Err(HcpError::Validation(format!(
                "transaction submitted_at {} is outside years 0000-9999",
                self.submitted_at
            )));
        }
        Ok(())
    }

    /// Truncate `submitted_at` to the microsecond precision the ledger keys
    /// carry, so every store orders ties the same way.
    pub fn normalize(&mut self) {
        self.submitted_at = truncate_to_micros(self.submitted_at);
    }

    /// Apply a confirmation report. Only pending transactions may move.
    pub fn apply_confirmation(&mut self, confirmation: &Confirmation) -> Result<(), HcpError> {
        if self.status.is_terminal() {
            return Err(HcpError::Validation(format!(
                "transaction {} is already {}",
                self.hash, self.status
            )));
        }
        if !confirmation.status.is_terminal() {
            return Err(HcpError::Validation(
                "confirmation status must be confirmed or failed".into(),
            ));
        }

        self.status = confirmation.status;
        self.confirmed_at = Some(confirmation.confirmed_at);
        self.latency_ms = confirmation.latency_ms.or_else(|| {
            let elapsed = confirmation.confirmed_at - self.submitted_at;
            Some(elapsed.num_microseconds()? as f64 / 1000.0)
        });
        if let Some(block) = &confirmation.block {
            self.block_number = block.number;
            self.block_hash = block.hash.clone();
            self.transaction_index = block.index;
        }
        if let Some(gas_used) = confirmation.gas_used {
            self.gas_used = gas_used;
        }
        self.error_message = confirmation.error_message.clone();
        Ok(())
    }
}

/// Block placement reported alongside a confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRef {
    pub number: i64,
    pub hash: String,
    pub index: u32,
}

/// Terminal outcome reported by the confirmation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub status: TransactionStatus,
    pub confirmed_at: DateTime<Utc>,
    /// When absent, derived from `confirmed_at - submitted_at`.
    pub latency_ms: Option<f64>,
    pub block: Option<BlockRef>,
    pub gas_used: Option<i64>,
    pub error_message: Option<String>,
}

/// Generate a `0x`-prefixed SHA-256 transaction hash.
///
/// Mixes the transaction's identifying fields with a random UUID so two
/// otherwise identical submissions still get distinct hashes.
pub fn generate_hash(tx: &Transaction) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tx.benchmark_id.as_bytes());
    hasher.update(tx.from_address.as_bytes());
    hasher.update(tx.to_address.as_bytes());
    hasher.update(tx.amount.to_le_bytes());
    hasher.update(tx.nonce.to_le_bytes());
    hasher.update(tx.submitted_at.to_rfc3339().as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Predicates for ledger listings. Results are ordered by `submitted_at`
/// descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub benchmark_id: Option<Uuid>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub status: Option<TransactionStatus>,
}

impl Filter<Transaction> for TransactionFilter {
    fn matches(&self, tx: &Transaction) -> bool {
        eq_opt(self.benchmark_id.as_ref(), &tx.benchmark_id)
            && eq_opt(self.from_address.as_deref(), tx.from_address.as_str())
            && eq_opt(self.to_address.as_deref(), tx.to_address.as_str())
            && eq_opt(self.status.as_ref(), &tx.status)
    }
}
