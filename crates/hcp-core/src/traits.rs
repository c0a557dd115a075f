// crates/hcp-core/src/traits.rs
//
// Capability sets for persistence. Implemented by hcp-store (RocksDB backend
// and the in-memory store); consumed by the registration protocol and the
// RPC boundary. Every method is one atomic unit against the store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::anomaly::{Anomaly, AnomalyFilter, AnomalyUpdate};
use crate::benchmark::Benchmark;
use crate::error::HcpError;
use crate::metric::{BenchmarkMetricQuery, Metric, NodeMetricQuery};
use crate::node::{Node, NodeFilter, NodeStatus};
use crate::query::{Page, PageRequest};
use crate::stats::TransactionStats;
use crate::transaction::{Confirmation, Transaction, TransactionFilter};

/// Node registry persistence.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// Insert a new node. Fails with `Conflict` if the id is taken.
    async fn create_node(&self, node: &Node) -> Result<(), HcpError>;

    async fn get_node(&self, id: &str) -> Result<Option<Node>, HcpError>;

    /// Ordered by id ascending.
    async fn list_nodes(&self, filter: &NodeFilter, page: PageRequest) -> Result<Page<Node>, HcpError>;

    /// Overwrite every field of an existing node except `registered_at`,
    /// which keeps its stored value. Returns the node as stored.
    /// Fails with `NotFound` if the id is unknown.
    async fn update_node(&self, node: &Node) -> Result<Node, HcpError>;

    /// Narrow status update. Fails with `NotFound` if the id is unknown.
    async fn update_node_status(&self, id: &str, status: NodeStatus) -> Result<Node, HcpError>;
}

/// Benchmark run persistence.
#[async_trait]
pub trait BenchmarkRepository: Send + Sync {
    /// Insert a run, generating its id when nil. `Conflict` if the id exists.
    async fn create_benchmark(&self, benchmark: Benchmark) -> Result<Benchmark, HcpError>;

    async fn get_benchmark(&self, id: &Uuid) -> Result<Option<Benchmark>, HcpError>;

    /// Ordered by `created_at` descending.
    async fn list_benchmarks(&self, page: PageRequest) -> Result<Page<Benchmark>, HcpError>;

    /// Overwrite a run's mutable fields; `created_at` is preserved.
    async fn update_benchmark(&self, benchmark: &Benchmark) -> Result<Benchmark, HcpError>;

    /// Delete a run and cascade to its transactions and metrics.
    /// Returns false if the run did not exist.
    async fn delete_benchmark(&self, id: &Uuid) -> Result<bool, HcpError>;
}

/// The transaction ledger.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Insert one transaction. `Conflict` on a duplicate hash, `Validation`
    /// if the owning benchmark does not exist.
    async fn create_transaction(&self, tx: &Transaction) -> Result<(), HcpError>;

    async fn get_transaction(&self, hash: &str) -> Result<Option<Transaction>, HcpError>;

    /// Ordered by `submitted_at` descending.
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<Page<Transaction>, HcpError>;

    /// Move a pending transaction to a terminal status.
    async fn confirm_transaction(
        &self,
        hash: &str,
        confirmation: &Confirmation,
    ) -> Result<Transaction, HcpError>;

    /// Counts by status and average latency over one snapshot of the ledger.
    async fn transaction_stats(&self, benchmark_id: &Uuid) -> Result<TransactionStats, HcpError>;
}

/// Time-series metric persistence.
#[async_trait]
pub trait MetricRepository: Send + Sync {
    /// Insert one sample. `Conflict` if its composite key exists.
    async fn create_metric(&self, metric: &Metric) -> Result<(), HcpError>;

    /// Insert all samples or none.
    async fn create_metrics(&self, metrics: &[Metric]) -> Result<(), HcpError>;

    /// Most recent first.
    async fn node_metrics(&self, query: &NodeMetricQuery, page: PageRequest) -> Result<Page<Metric>, HcpError>;

    /// Most recent first.
    async fn benchmark_metrics(
        &self,
        query: &BenchmarkMetricQuery,
        page: PageRequest,
    ) -> Result<Page<Metric>, HcpError>;
}

/// Anomaly persistence and resolution workflow.
#[async_trait]
pub trait AnomalyRepository: Send + Sync {
    /// Insert a record, generating its id. Status starts at `new`.
    async fn create_anomaly(&self, anomaly: Anomaly) -> Result<Anomaly, HcpError>;

    async fn get_anomaly(&self, id: &Uuid) -> Result<Option<Anomaly>, HcpError>;

    /// Ordered by `detected_at` descending.
    async fn list_anomalies(&self, filter: &AnomalyFilter, page: PageRequest) -> Result<Page<Anomaly>, HcpError>;

    /// Advance the workflow. `NotFound` for an unknown id, `Validation` for
    /// a disallowed transition.
    async fn update_anomaly_status(&self, id: &Uuid, update: &AnomalyUpdate) -> Result<Anomaly, HcpError>;
}

/// Every capability the request boundary needs, as one object.
#[async_trait]
pub trait TelemetryStore:
    NodeRepository + BenchmarkRepository + TransactionLedger + MetricRepository + AnomalyRepository
{
    /// Cheap round-trip used by health checks.
    async fn ping(&self) -> Result<(), HcpError>;
}
