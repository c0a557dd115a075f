// crates/hcp-store/src/benchmarks.rs
//
// Benchmark runs on RocksDB, including the cascading delete: removing a run
// removes its ledger rows with both of their index entries, and its metric
// samples with their secondary keys, in the same write batch. Both halves
// are found through the per-benchmark indexes.

use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{Direction, IteratorMode, WriteBatch};
use uuid::Uuid;

use hcp_core::benchmark::Benchmark;
use hcp_core::error::HcpError;
use hcp_core::query::{paginate, Page, PageRequest};
use hcp_core::traits::BenchmarkRepository;

use crate::keys::{decode_ts, uuid_key, TS_LEN};
use crate::partition::partition_name;
use crate::rocks::{storage_err, RocksStore, StoreInner};
use crate::schema::{CF_BENCHMARKS, CF_METRICS, CF_METRICS_BY_BENCHMARK, CF_TX_BY_BENCHMARK, CF_TX_INDEX};

/// Contract order for benchmark listings: newest run first.
pub(crate) fn newest_benchmark_first(a: &Benchmark, b: &Benchmark) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

impl StoreInner {
    pub(crate) fn benchmark_exists(&self, id: &Uuid) -> Result<bool, HcpError> {
        self.exists(CF_BENCHMARKS, &uuid_key(id))
    }

    fn create_benchmark_sync(&self, mut benchmark: Benchmark) -> Result<Benchmark, HcpError> {
        benchmark.validate()?;
        let id = benchmark.prepare_for_create(Utc::now());
        let _latch = self.latch()?;
        if self.benchmark_exists(&id)? {
            return Err(HcpError::Conflict(format!("benchmark {} already exists", id)));
        }
        self.put_json(CF_BENCHMARKS, &uuid_key(&id), &benchmark)?;
        tracing::info!(
            parent: &self.span,
            benchmark_id = %id,
            algorithm = %benchmark.algorithm,
            "benchmark created"
        );
        Ok(benchmark)
    }

    fn update_benchmark_sync(&self, benchmark: &Benchmark) -> Result<Benchmark, HcpError> {
        benchmark.validate()?;
        let _latch = self.latch()?;
        let existing: Benchmark = self
            .get_json(CF_BENCHMARKS, &uuid_key(&benchmark.id))?
            .ok_or_else(|| HcpError::NotFound(format!("benchmark {}", benchmark.id)))?;

        let mut stored = benchmark.clone();
        stored.created_at = existing.created_at;
        stored.updated_at = Utc::now();
        self.put_json(CF_BENCHMARKS, &uuid_key(&stored.id), &stored)?;
        Ok(stored)
    }

    fn delete_benchmark_sync(&self, id: &Uuid) -> Result<bool, HcpError> {
        let _latch = self.latch()?;
        if !self.benchmark_exists(id)? {
            return Ok(false);
        }

        let mut batch = WriteBatch::default();
        let prefix = uuid_key(id);

        let tx_index = self.cf(CF_TX_INDEX)?;
        let tx_by_benchmark = self.cf(CF_TX_BY_BENCHMARK)?;
        let mut removed_tx = 0usize;
        for item in self
            .db
            .iterator_cf(&tx_by_benchmark, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, record_key) = item.map_err(|e| storage_err("iterate", e))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let partition = self.cf(&partition_name(decode_ts(&record_key)?))?;
            batch.delete_cf(&partition, &record_key);
            batch.delete_cf(&tx_index, &record_key[TS_LEN..]);
            batch.delete_cf(&tx_by_benchmark, &key);
            removed_tx += 1;
        }

        let metrics = self.cf(CF_METRICS)?;
        let by_benchmark = self.cf(CF_METRICS_BY_BENCHMARK)?;
        let mut removed_metrics = 0usize;
        for item in self
            .db
            .iterator_cf(&by_benchmark, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, primary) = item.map_err(|e| storage_err("iterate", e))?;
            if !key.starts_with(&prefix) {
                break;
            }
            batch.delete_cf(&by_benchmark, &key);
            batch.delete_cf(&metrics, &primary);
            removed_metrics += 1;
        }

        batch.delete_cf(&self.cf(CF_BENCHMARKS)?, prefix);
        self.db.write(batch).map_err(|e| storage_err("write", e))?;

        tracing::info!(
            parent: &self.span,
            benchmark_id = %id,
            transactions = removed_tx,
            metrics = removed_metrics,
            "benchmark deleted"
        );
        Ok(true)
    }
}

#[async_trait]
impl BenchmarkRepository for RocksStore {
    async fn create_benchmark(&self, benchmark: Benchmark) -> Result<Benchmark, HcpError> {
        self.run(move |inner| inner.create_benchmark_sync(benchmark)).await
    }

    async fn get_benchmark(&self, id: &Uuid) -> Result<Option<Benchmark>, HcpError> {
        let id = *id;
        self.run(move |inner| inner.get_json(CF_BENCHMARKS, &uuid_key(&id))).await
    }

    async fn list_benchmarks(&self, page: PageRequest) -> Result<Page<Benchmark>, HcpError> {
        self.run(move |inner| {
            let mut runs: Vec<Benchmark> = inner.scan_json(CF_BENCHMARKS)?;
            runs.sort_by(newest_benchmark_first);
            Ok(paginate(runs, page))
        })
        .await
    }

    async fn update_benchmark(&self, benchmark: &Benchmark) -> Result<Benchmark, HcpError> {
        let benchmark = benchmark.clone();
        self.run(move |inner| inner.update_benchmark_sync(&benchmark)).await
    }

    async fn delete_benchmark(&self, id: &Uuid) -> Result<bool, HcpError> {
        let id = *id;
        self.run(move |inner| inner.delete_benchmark_sync(&id)).await
    }
}
