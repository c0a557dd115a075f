// crates/hcp-store/src/metrics.rs
//
// Time-series metric store on RocksDB.
//
// The composite natural key is the primary key, so a duplicate sample is a
// key collision rather than a second row. Node range queries seek straight
// to the end bound and walk backwards; benchmark queries walk the secondary
// index, which is ordered by time within a benchmark.

use std::collections::BTreeSet;

use async_trait::async_trait;
use rocksdb::{Direction, IteratorMode, WriteBatch};

use hcp_core::error::HcpError;
use hcp_core::metric::{BenchmarkMetricQuery, Metric, MetricKey, NodeMetricQuery};
use hcp_core::query::{paginate, Filter, Page, PageRequest};
use hcp_core::traits::MetricRepository;

use crate::keys::{
    benchmark_metric_key, decode_ts, metric_key, node_metric_prefix, reverse_seek_key, uuid_key,
};
use crate::rocks::{storage_err, RocksStore, StoreInner};
use crate::schema::{CF_METRICS, CF_METRICS_BY_BENCHMARK, CF_NODES};

impl StoreInner {
    /// Normalise and check one batch without touching the store.
    fn prepare_metrics(&self, metrics: &[Metric]) -> Result<Vec<Metric>, HcpError> {
        if metrics.len() > self.config.max_metric_batch {
            return Err(HcpError::Validation(format!(
                "metric batch of {} exceeds limit of {}",
                metrics.len(),
                self.config.max_metric_batch
            )));
        }

        let mut seen = BTreeSet::new();
        let mut prepared = Vec::with_capacity(metrics.len());
        for metric in metrics {
            let mut metric = metric.clone();
            metric.normalize();
            metric.validate()?;
            if !seen.insert(metric.key()) {
                return Err(duplicate(&metric.key()));
            }
            prepared.push(metric);
        }
        Ok(prepared)
    }

    fn insert_metrics(&self, metrics: &[Metric]) -> Result<(), HcpError> {
        let prepared = self.prepare_metrics(metrics)?;
        if prepared.is_empty() {
            return Ok(());
        }

        let _latch = self.latch()?;
        let primary = self.cf(CF_METRICS)?;
        let secondary = self.cf(CF_METRICS_BY_BENCHMARK)?;
        let mut batch = WriteBatch::default();

        for metric in &prepared {
            if !self.exists(CF_NODES, metric.node_id.as_bytes())? {
                return Err(HcpError::Validation(format!("node {} does not exist", metric.node_id)));
            }
            if !self.benchmark_exists(&metric.benchmark_id)? {
                return Err(HcpError::Validation(format!(
                    "benchmark {} does not exist",
                    metric.benchmark_id
                )));
            }

            let key = metric_key(&metric.key());
            if self.exists(CF_METRICS, &key)? {
                return Err(duplicate(&metric.key()));
            }
            batch.put_cf(&primary, &key, serde_json::to_vec(metric)?);
            batch.put_cf(&secondary, benchmark_metric_key(metric), &key);
        }

        self.db.write(batch).map_err(|e| storage_err("write", e))?;
        tracing::debug!(parent: &self.span, samples = prepared.len(), "metrics recorded");
        Ok(())
    }

    fn node_metrics_sync(&self, query: &NodeMetricQuery, page: PageRequest) -> Result<Page<Metric>, HcpError> {
        let handle = self.cf(CF_METRICS)?;
        let snapshot = self.db.snapshot();
        let prefix = node_metric_prefix(&query.node_id);
        let seek = reverse_seek_key(&prefix, query.end_time);

        let mut rows = Vec::new();
        for item in snapshot.iterator_cf(&handle, IteratorMode::From(&seek, Direction::Reverse)) {
            let (key, value) = item.map_err(|e| storage_err("iterate", e))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let ts = decode_ts(&key[prefix.len()..])?;
            if query.start_time.is_some_and(|start| ts < start) {
                break;
            }
            let metric: Metric = serde_json::from_slice(&value)?;
            if query.matches(&metric) {
                rows.push(metric);
            }
        }
        Ok(paginate(rows, page))
    }

    fn benchmark_metrics_sync(
        &self,
        query: &BenchmarkMetricQuery,
        page: PageRequest,
    ) -> Result<Page<Metric>, HcpError> {
        let primary = self.cf(CF_METRICS)?;
        let secondary = self.cf(CF_METRICS_BY_BENCHMARK)?;
        let snapshot = self.db.snapshot();
        let prefix = uuid_key(&query.benchmark_id);
        let seek = reverse_seek_key(&prefix, None);

        let mut rows = Vec::new();
        for item in snapshot.iterator_cf(&secondary, IteratorMode::From(&seek, Direction::Reverse)) {
            let (key, primary_key) = item.map_err(|e| storage_err("iterate", e))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let Some(value) = snapshot
                .get_cf(&primary, &primary_key)
                .map_err(|e| storage_err("get", e))?
            else {
                continue;
            };
            let metric: Metric = serde_json::from_slice(&value)?;
            if query.matches(&metric) {
                rows.push(metric);
            }
        }
        Ok(paginate(rows, page))
    }
}

fn duplicate(key: &MetricKey) -> HcpError {
    HcpError::Conflict(format!(
        "metric {} for node {} at {} already recorded",
        key.metric_name,
        key.node_id,
        key.timestamp.to_rfc3339()
    ))
}

#[async_trait]
impl MetricRepository for RocksStore {
    async fn create_metric(&self, metric: &Metric) -> Result<(), HcpError> {
        let metric = metric.clone();
        self.run(move |inner| inner.insert_metrics(std::slice::from_ref(&metric)))
            .await
    }

    async fn create_metrics(&self, metrics: &[Metric]) -> Result<(), HcpError> {
        let metrics = metrics.to_vec();
        self.run(move |inner| inner.insert_metrics(&metrics)).await
    }

    async fn node_metrics(&self, query: &NodeMetricQuery, page: PageRequest) -> Result<Page<Metric>, HcpError> {
        let query = query.clone();
        self.run(move |inner| inner.node_metrics_sync(&query, page)).await
    }

    async fn benchmark_metrics(
        &self,
        query: &BenchmarkMetricQuery,
        page: PageRequest,
    ) -> Result<Page<Metric>, HcpError> {
        let query = query.clone();
        self.run(move |inner| inner.benchmark_metrics_sync(&query, page)).await
    }
}
