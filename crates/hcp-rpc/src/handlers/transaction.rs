// crates/hcp-rpc/src/handlers/transaction.rs
//
// Transaction ledger handlers: Create, Get, List, Confirm, Stats.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use hcp_core::error::{parse_uuid, HcpError};
use hcp_core::traits::TransactionLedger;
use hcp_core::transaction::{
    generate_hash, BlockRef, Confirmation, Transaction, TransactionFilter, TransactionStatus,
};

use super::{
    non_empty, page_request, parse_optional, parse_optional_uuid, parse_time, PaginationResponse,
    SharedStore,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction: Transaction,
}

// ---------------------------------------------------------------------------
// CreateTransaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    /// Generated when absent.
    #[serde(default)]
    pub hash: Option<String>,
    pub benchmark_id: String,
    pub from_address: String,
    pub to_address: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub gas_price: i64,
    #[serde(default)]
    pub gas_limit: i64,
    #[serde(default)]
    pub nonce: i64,
    /// RFC 3339; defaults to now.
    #[serde(default)]
    pub submitted_at: Option<String>,
}

pub async fn handle_create_transaction(
    store: &SharedStore,
    request: CreateTransactionRequest,
) -> Result<TransactionResponse, HcpError> {
    let benchmark_id = parse_uuid("benchmark_id", &request.benchmark_id)?;

    let mut tx = Transaction::pending(benchmark_id, request.from_address, request.to_address, request.amount);
    tx.gas_price = request.gas_price;
    tx.gas_limit = request.gas_limit;
    tx.nonce = request.nonce;
    if let Some(submitted_at) = parse_time("submitted_at", request.submitted_at)? {
        tx.submitted_at = submitted_at;
    }
    tx.normalize();
    tx.hash = match non_empty(request.hash) {
        Some(hash) => hash,
        None => generate_hash(&tx),
    };

    store.create_transaction(&tx).await?;
    Ok(TransactionResponse { transaction: tx })
}

// ---------------------------------------------------------------------------
// GetTransaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTransactionRequest {
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTransactionResponse {
    pub found: bool,
    pub transaction: Option<Transaction>,
}

pub async fn handle_get_transaction(
    store: &SharedStore,
    request: GetTransactionRequest,
) -> Result<GetTransactionResponse, HcpError> {
    let transaction = store.get_transaction(&request.hash).await?;
    Ok(GetTransactionResponse {
        found: transaction.is_some(),
        transaction,
    })
}

// ---------------------------------------------------------------------------
// ListTransactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListTransactionsRequest {
    pub benchmark_id: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub pagination: PaginationResponse,
}

pub async fn handle_list_transactions(
    store: &SharedStore,
    request: ListTransactionsRequest,
) -> Result<ListTransactionsResponse, HcpError> {
    let filter = TransactionFilter {
        benchmark_id: parse_optional_uuid("benchmark_id", request.benchmark_id)?,
        from_address: non_empty(request.from_address),
        to_address: non_empty(request.to_address),
        status: parse_optional(request.status)?,
    };
    let page = store
        .list_transactions(&filter, page_request(request.page, request.page_size))
        .await?;
    Ok(ListTransactionsResponse {
        pagination: PaginationResponse::from(&page),
        transactions: page.items,
    })
}

// ---------------------------------------------------------------------------
// ConfirmTransaction
// ---------------------------------------------------------------------------

/// Outcome reported by the confirmation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmTransactionRequest {
    pub hash: String,
    /// "confirmed" or "failed".
    pub status: String,
    /// RFC 3339; defaults to now.
    #[serde(default)]
    pub confirmed_at: Option<String>,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub block_number: Option<i64>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub transaction_index: Option<u32>,
    #[serde(default)]
    pub gas_used: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

pub async fn handle_confirm_transaction(
    store: &SharedStore,
    request: ConfirmTransactionRequest,
) -> Result<TransactionResponse, HcpError> {
    let status: TransactionStatus = request.status.parse()?;
    let block = request.block_number.map(|number| BlockRef {
        number,
        hash: request.block_hash.clone().unwrap_or_default(),
        index: request.transaction_index.unwrap_or_default(),
    });
    let confirmation = Confirmation {
        status,
        confirmed_at: parse_time("confirmed_at", request.confirmed_at)?.unwrap_or_else(Utc::now),
        latency_ms: request.latency_ms,
        block,
        gas_used: request.gas_used,
        error_message: non_empty(request.error_message),
    };

    let transaction = store.confirm_transaction(&request.hash, &confirmation).await?;
    Ok(TransactionResponse { transaction })
}

// ---------------------------------------------------------------------------
// GetTransactionStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatsRequest {
    pub benchmark_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStatsResponse {
    pub total_transactions: u64,
    pub pending_count: u64,
    pub confirmed_count: u64,
    pub failed_count: u64,
    pub avg_latency_ms: f64,
}

pub async fn handle_transaction_stats(
    store: &SharedStore,
    request: TransactionStatsRequest,
) -> Result<TransactionStatsResponse, HcpError> {
    let benchmark_id = parse_uuid("benchmark_id", &request.benchmark_id)?;
    let stats = store.transaction_stats(&benchmark_id).await?;
    Ok(TransactionStatsResponse {
        total_transactions: stats.total,
        pending_count: stats.pending_count,
        confirmed_count: stats.confirmed_count,
        failed_count: stats.failed_count,
        avg_latency_ms: stats.avg_latency_ms,
    })
}
