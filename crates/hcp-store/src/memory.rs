// crates/hcp-store/src/memory.rs
//
// In-memory implementation of every repository trait.
//
// Same contracts as `RocksStore` (ordering, uniqueness, foreign relations,
// all-or-nothing batches, cascading delete) over plain maps behind one
// `RwLock`. Holding the write guard for the whole call makes every operation
// atomic; holding the read guard gives listings and stats a consistent view.
// Used by the RPC tests and by embedders that do not need durability.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::Span;
use uuid::Uuid;

use hcp_core::anomaly::{Anomaly, AnomalyFilter, AnomalyUpdate};
use hcp_core::benchmark::Benchmark;
use hcp_core::error::HcpError;
use hcp_core::metric::{newest_first, BenchmarkMetricQuery, Metric, MetricKey, NodeMetricQuery};
use hcp_core::node::{Node, NodeFilter, NodeStatus};
use hcp_core::query::{paginate, Filter, Page, PageRequest};
use hcp_core::stats::TransactionStats;
use hcp_core::traits::{
    AnomalyRepository, BenchmarkRepository, MetricRepository, NodeRepository, TelemetryStore,
    TransactionLedger,
};
use hcp_core::transaction::{Confirmation, Transaction, TransactionFilter};

use crate::anomalies::newest_anomaly_first;
use crate::benchmarks::newest_benchmark_first;
use crate::ledger::newest_transaction_first;
use crate::rocks::StoreConfig;

#[derive(Debug, Default)]
struct Tables {
    nodes: BTreeMap<String, Node>,
    benchmarks: HashMap<Uuid, Benchmark>,
    transactions: HashMap<String, Transaction>,
    metrics: BTreeMap<MetricKey, Metric>,
    anomalies: HashMap<Uuid, Anomaly>,
}

/// Non-durable store with the same semantics as the RocksDB store.
#[derive(Debug)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    config: StoreConfig,
    span: Span,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default(), Span::none())
    }

    pub fn with_config(config: StoreConfig, span: Span) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            config,
            span,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, HcpError> {
        self.tables
            .read()
            .map_err(|_| HcpError::StoreUnavailable("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, HcpError> {
        self.tables
            .write()
            .map_err(|_| HcpError::StoreUnavailable("in-memory store lock poisoned".into()))
    }
}

fn missing_benchmark(id: &Uuid) -> HcpError {
    HcpError::Validation(format!("benchmark {} does not exist", id))
}

#[async_trait]
impl NodeRepository for InMemoryStore {
    async fn create_node(&self, node: &Node) -> Result<(), HcpError> {
        node.validate()?;
        let mut tables = self.write()?;
        if tables.nodes.contains_key(&node.id) {
            return Err(HcpError::Conflict(format!("node {} already registered", node.id)));
        }
        tables.nodes.insert(node.id.clone(), node.clone());
        tracing::debug!(parent: &self.span, node_id = %node.id, "node created");
        Ok(())
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>, HcpError> {
        Ok(self.read()?.nodes.get(id).cloned())
    }

    async fn list_nodes(&self, filter: &NodeFilter, page: PageRequest) -> Result<Page<Node>, HcpError> {
        let tables = self.read()?;
        Ok(paginate(
            tables.nodes.values().filter(|n| filter.matches(n)).cloned(),
            page,
        ))
    }

    async fn update_node(&self, node: &Node) -> Result<Node, HcpError> {
        node.validate()?;
        let mut tables = self.write()?;
        let existing = tables
            .nodes
            .get_mut(&node.id)
            .ok_or_else(|| HcpError::NotFound(format!("node {}", node.id)))?;
        let registered_at = existing.registered_at;
        *existing = node.clone();
        existing.registered_at = registered_at;
        Ok(existing.clone())
    }

    async fn update_node_status(&self, id: &str, status: NodeStatus) -> Result<Node, HcpError> {
        let mut tables = self.write()?;
        let node = tables
            .nodes
            .get_mut(id)
            .ok_or_else(|| HcpError::NotFound(format!("node {}", id)))?;
        node.status = status;
        node.updated_at = Utc::now();
        Ok(node.clone())
    }
}

#[async_trait]
impl BenchmarkRepository for InMemoryStore {
    async fn create_benchmark(&self, mut benchmark: Benchmark) -> Result<Benchmark, HcpError> {
        benchmark.validate()?;
        let id = benchmark.prepare_for_create(Utc::now());
        let mut tables = self.write()?;
        if tables.benchmarks.contains_key(&id) {
            return Err(HcpError::Conflict(format!("benchmark {} already exists", id)));
        }
        tables.benchmarks.insert(id, benchmark.clone());
        tracing::info!(parent: &self.span, benchmark_id = %id, "benchmark created");
        Ok(benchmark)
    }

    async fn get_benchmark(&self, id: &Uuid) -> Result<Option<Benchmark>, HcpError> {
        Ok(self.read()?.benchmarks.get(id).cloned())
    }

    async fn list_benchmarks(&self, page: PageRequest) -> Result<Page<Benchmark>, HcpError> {
        let mut runs: Vec<Benchmark> = self.read()?.benchmarks.values().cloned().collect();
        runs.sort_by(newest_benchmark_first);
        Ok(paginate(runs, page))
    }

    async fn update_benchmark(&self, benchmark: &Benchmark) -> Result<Benchmark, HcpError> {
        benchmark.validate()?;
        let mut tables = self.write()?;
        let existing = tables
            .benchmarks
            .get_mut(&benchmark.id)
            .ok_or_else(|| HcpError::NotFound(format!("benchmark {}", benchmark.id)))?;
        let created_at = existing.created_at;
        *existing = benchmark.clone();
        existing.created_at = created_at;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete_benchmark(&self, id: &Uuid) -> Result<bool, HcpError> {
        let mut tables = self.write()?;
        if tables.benchmarks.remove(id).is_none() {
            return Ok(false);
        }
        tables.transactions.retain(|_, tx| tx.benchmark_id != *id);
        tables.metrics.retain(|_, m| m.benchmark_id != *id);
        tracing::info!(parent: &self.span, benchmark_id = %id, "benchmark deleted");
        Ok(true)
    }
}

#[async_trait]
impl TransactionLedger for InMemoryStore {
    async fn create_transaction(&self, tx: &Transaction) -> Result<(), HcpError> {
        let mut tx = tx.clone();
        tx.normalize();
        tx.validate()?;
        let mut tables = self.write()?;
        if !tables.benchmarks.contains_key(&tx.benchmark_id) {
            return Err(missing_benchmark(&tx.benchmark_id));
        }
        if tables.transactions.contains_key(&tx.hash) {
            return Err(HcpError::Conflict(format!("transaction {} already exists", tx.hash)));
        }
        tables.transactions.insert(tx.hash.clone(), tx);
        Ok(())
    }

    async fn get_transaction(&self, hash: &str) -> Result<Option<Transaction>, HcpError> {
        Ok(self.read()?.transactions.get(hash).cloned())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<Page<Transaction>, HcpError> {
        let mut rows: Vec<Transaction> = self
            .read()?
            .transactions
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        rows.sort_by(newest_transaction_first);
        Ok(paginate(rows, page))
    }

    async fn confirm_transaction(
        &self,
        hash: &str,
        confirmation: &Confirmation,
    ) -> Result<Transaction, HcpError> {
        let mut tables = self.write()?;
        let tx = tables
            .transactions
            .get_mut(hash)
            .ok_or_else(|| HcpError::NotFound(format!("transaction {}", hash)))?;
        tx.apply_confirmation(confirmation)?;
        Ok(tx.clone())
    }

    async fn transaction_stats(&self, benchmark_id: &Uuid) -> Result<TransactionStats, HcpError> {
        let tables = self.read()?;
        Ok(tables
            .transactions
            .values()
            .filter(|tx| tx.benchmark_id == *benchmark_id)
            .collect())
    }
}

#[async_trait]
impl MetricRepository for InMemoryStore {
    async fn create_metric(&self, metric: &Metric) -> Result<(), HcpError> {
        self.create_metrics(std::slice::from_ref(metric)).await
    }

    async fn create_metrics(&self, metrics: &[Metric]) -> Result<(), HcpError> {
        if metrics.len() > self.config.max_metric_batch {
            return Err(HcpError::Validation(format!(
                "metric batch of {} exceeds limit of {}",
                metrics.len(),
                self.config.max_metric_batch
            )));
        }

        let mut tables = self.write()?;
        let mut seen = BTreeSet::new();
        let mut staged = Vec::with_capacity(metrics.len());
        for metric in metrics {
            let mut metric = metric.clone();
            metric.normalize();
            metric.validate()?;
            if !tables.nodes.contains_key(&metric.node_id) {
                return Err(HcpError::Validation(format!("node {} does not exist", metric.node_id)));
            }
            if !tables.benchmarks.contains_key(&metric.benchmark_id) {
                return Err(missing_benchmark(&metric.benchmark_id));
            }
            let key = metric.key();
            if tables.metrics.contains_key(&key) || !seen.insert(key.clone()) {
                return Err(HcpError::Conflict(format!(
                    "metric {} for node {} at {} already recorded",
                    key.metric_name,
                    key.node_id,
                    key.timestamp.to_rfc3339()
                )));
            }
            staged.push((key, metric));
        }

        tables.metrics.extend(staged);
        Ok(())
    }

    async fn node_metrics(&self, query: &NodeMetricQuery, page: PageRequest) -> Result<Page<Metric>, HcpError> {
        let mut rows: Vec<Metric> = self
            .read()?
            .metrics
            .values()
            .filter(|m| query.matches(m))
            .cloned()
            .collect();
        rows.sort_by(newest_first);
        Ok(paginate(rows, page))
    }

    async fn benchmark_metrics(
        &self,
        query: &BenchmarkMetricQuery,
        page: PageRequest,
    ) -> Result<Page<Metric>, HcpError> {
        let mut rows: Vec<Metric> = self
            .read()?
            .metrics
            .values()
            .filter(|m| query.matches(m))
            .cloned()
            .collect();
        rows.sort_by(newest_first);
        Ok(paginate(rows, page))
    }
}

#[async_trait]
impl AnomalyRepository for InMemoryStore {
    async fn create_anomaly(&self, mut anomaly: Anomaly) -> Result<Anomaly, HcpError> {
        anomaly.validate()?;
        let id = anomaly.prepare_for_create(Utc::now());
        let mut tables = self.write()?;
        if !tables.benchmarks.contains_key(&anomaly.benchmark_id) {
            return Err(missing_benchmark(&anomaly.benchmark_id));
        }
        if tables.anomalies.contains_key(&id) {
            return Err(HcpError::Conflict(format!("anomaly {} already exists", id)));
        }
        tables.anomalies.insert(id, anomaly.clone());
        Ok(anomaly)
    }

    async fn get_anomaly(&self, id: &Uuid) -> Result<Option<Anomaly>, HcpError> {
        Ok(self.read()?.anomalies.get(id).cloned())
    }

    async fn list_anomalies(&self, filter: &AnomalyFilter, page: PageRequest) -> Result<Page<Anomaly>, HcpError> {
        let mut rows: Vec<Anomaly> = self
            .read()?
            .anomalies
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        rows.sort_by(newest_anomaly_first);
        Ok(paginate(rows, page))
    }

    async fn update_anomaly_status(&self, id: &Uuid, update: &AnomalyUpdate) -> Result<Anomaly, HcpError> {
        let mut tables = self.write()?;
        let anomaly = tables
            .anomalies
            .get_mut(id)
            .ok_or_else(|| HcpError::NotFound(format!("anomaly {}", id)))?;
        anomaly.apply_update(update, Utc::now())?;
        Ok(anomaly.clone())
    }
}

#[async_trait]
impl TelemetryStore for InMemoryStore {
    async fn ping(&self) -> Result<(), HcpError> {
        self.read().map(|_| ())
    }
}
