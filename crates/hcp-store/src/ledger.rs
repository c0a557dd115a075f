// crates/hcp-store/src/ledger.rs
//
// The month-partitioned transaction ledger on RocksDB.
//
// A transaction is written to the partition of the month containing its
// `submitted_at`, under `{submitted_at}{hash}`, and its hash is recorded in
// `tx_index` together with the encoded `submitted_at`, and under its run in
// `tx_by_benchmark`. Point lookups go through `tx_index`. Anything scoped to
// one benchmark walks that run's slice of `tx_by_benchmark` backwards;
// everything else walks partitions newest first and each partition in
// reverse key order. Either way rows come out by `submitted_at` descending
// without a sort. None of this is visible through the trait.

use async_trait::async_trait;
use rocksdb::{Direction, IteratorMode, WriteBatch};
use uuid::Uuid;

use hcp_core::error::HcpError;
use hcp_core::query::{Filter, Page, PageCollector, PageRequest};
use hcp_core::stats::{StatsAccumulator, TransactionStats};
use hcp_core::traits::TransactionLedger;
use hcp_core::transaction::{Confirmation, Transaction, TransactionFilter};

use crate::keys::{benchmark_ledger_key, decode_ts, encode_ts, ledger_key, reverse_seek_key, uuid_key};
use crate::partition::partition_name;
use crate::rocks::{storage_err, RocksStore, StoreInner};
use crate::schema::{CF_TX_BY_BENCHMARK, CF_TX_INDEX};

/// Contract order for ledger listings.
pub(crate) fn newest_transaction_first(a: &Transaction, b: &Transaction) -> std::cmp::Ordering {
    b.submitted_at
        .cmp(&a.submitted_at)
        .then_with(|| b.hash.cmp(&a.hash))
}

impl StoreInner {
    /// Resolve a hash to `(partition, record key)` through the index.
    fn locate(&self, hash: &str) -> Result<Option<(String, Vec<u8>)>, HcpError> {
        let index = self.cf(CF_TX_INDEX)?;
        let Some(raw) = self
            .db
            .get_cf(&index, hash.as_bytes())
            .map_err(|e| storage_err("get", e))?
        else {
            return Ok(None);
        };
        let submitted_at = decode_ts(&raw)?;
        Ok(Some((partition_name(submitted_at), ledger_key(submitted_at, hash))))
    }

    fn create_transaction_sync(&self, mut tx: Transaction) -> Result<(), HcpError> {
        tx.normalize();
        tx.validate()?;
        let _latch = self.latch()?;

        if !self.benchmark_exists(&tx.benchmark_id)? {
            return Err(HcpError::Validation(format!(
                "benchmark {} does not exist",
                tx.benchmark_id
            )));
        }
        if self.exists(CF_TX_INDEX, tx.hash.as_bytes())? {
            return Err(HcpError::Conflict(format!("transaction {} already exists", tx.hash)));
        }

        let partition = self.ensure_partition(tx.submitted_at)?;

        let record_key = ledger_key(tx.submitted_at, &tx.hash);
        let mut batch = WriteBatch::default();
        batch.put_cf(&self.cf(&partition)?, &record_key, serde_json::to_vec(&tx)?);
        batch.put_cf(&self.cf(CF_TX_INDEX)?, tx.hash.as_bytes(), encode_ts(tx.submitted_at));
        batch.put_cf(
            &self.cf(CF_TX_BY_BENCHMARK)?,
            benchmark_ledger_key(&tx.benchmark_id, tx.submitted_at, &tx.hash),
            &record_key,
        );
        self.db.write(batch).map_err(|e| storage_err("write", e))?;

        tracing::debug!(
            parent: &self.span,
            hash = %tx.hash,
            partition = %partition,
            "transaction recorded"
        );
        Ok(())
    }

    fn get_transaction_sync(&self, hash: &str) -> Result<Option<Transaction>, HcpError> {
        match self.locate(hash)? {
            Some((partition, key)) => self.get_json(&partition, &key),
            None => Ok(None),
        }
    }

    /// Visit every ledger row of one snapshot, newest first.
    fn scan_ledger<F>(&self, mut visit: F) -> Result<(), HcpError>
    where
        F: FnMut(Transaction),
    {
        let snapshot = self.db.snapshot();
        for partition in self.read_partitions()?.iter().rev() {
            let handle = self.cf(partition)?;
            for item in snapshot.iterator_cf(&handle, IteratorMode::End) {
                let (_key, value) = item.map_err(|e| storage_err("iterate", e))?;
                visit(serde_json::from_slice(&value)?);
            }
        }
        Ok(())
    }

    /// Visit one benchmark's ledger rows from one snapshot, newest first.
    pub(crate) fn scan_benchmark_ledger<F>(&self, benchmark_id: &Uuid, mut visit: F) -> Result<(), HcpError>
    where
        F: FnMut(Transaction),
    {
        let index = self.cf(CF_TX_BY_BENCHMARK)?;
        let snapshot = self.db.snapshot();
        let prefix = uuid_key(benchmark_id);
        let seek = reverse_seek_key(&prefix, None);

        for item in snapshot.iterator_cf(&index, IteratorMode::From(&seek, Direction::Reverse)) {
            let (key, record_key) = item.map_err(|e| storage_err("iterate", e))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let partition = self.cf(&partition_name(decode_ts(&record_key)?))?;
            let Some(value) = snapshot
                .get_cf(&partition, &record_key)
                .map_err(|e| storage_err("get", e))?
            else {
                continue;
            };
            visit(serde_json::from_slice(&value)?);
        }
        Ok(())
    }

    fn list_transactions_sync(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<Page<Transaction>, HcpError> {
        let mut collector = PageCollector::new(page);
        let visit = |tx: Transaction| {
            if filter.matches(&tx) {
                collector.push(tx);
            }
        };
        match &filter.benchmark_id {
            Some(id) => self.scan_benchmark_ledger(id, visit)?,
            None => self.scan_ledger(visit)?,
        }
        Ok(collector.finish())
    }

    fn confirm_transaction_sync(&self, hash: &str, confirmation: &Confirmation) -> Result<Transaction, HcpError> {
        let _latch = self.latch()?;
        let (partition, key) = self
            .locate(hash)?
            .ok_or_else(|| HcpError::NotFound(format!("transaction {}", hash)))?;
        let mut tx: Transaction = self
            .get_json(&partition, &key)?
            .ok_or_else(|| HcpError::NotFound(format!("transaction {}", hash)))?;

        tx.apply_confirmation(confirmation)?;
        self.put_json(&partition, &key, &tx)?;
        tracing::debug!(parent: &self.span, hash = %hash, status = %tx.status, "transaction confirmed");
        Ok(tx)
    }

    fn transaction_stats_sync(&self, benchmark_id: &Uuid) -> Result<TransactionStats, HcpError> {
        let mut acc = StatsAccumulator::new();
        self.scan_benchmark_ledger(benchmark_id, |tx| acc.observe(&tx))?;
        Ok(acc.finish())
    }
}

#[async_trait]
impl TransactionLedger for RocksStore {
    async fn create_transaction(&self, tx: &Transaction) -> Result<(), HcpError> {
        let tx = tx.clone();
        self.run(move |inner| inner.create_transaction_sync(tx)).await
    }

    async fn get_transaction(&self, hash: &str) -> Result<Option<Transaction>, HcpError> {
        let hash = hash.to_string();
        self.run(move |inner| inner.get_transaction_sync(&hash)).await
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<Page<Transaction>, HcpError> {
        let filter = filter.clone();
        self.run(move |inner| inner.list_transactions_sync(&filter, page)).await
    }

    async fn confirm_transaction(
        &self,
        hash: &str,
        confirmation: &Confirmation,
    ) -> Result<Transaction, HcpError> {
        let hash = hash.to_string();
        let confirmation = confirmation.clone();
        self.run(move |inner| inner.confirm_transaction_sync(&hash, &confirmation))
            .await
    }

    async fn transaction_stats(&self, benchmark_id: &Uuid) -> Result<TransactionStats, HcpError> {
        let id = *benchmark_id;
        self.run(move |inner| inner.transaction_stats_sync(&id)).await
    }
}
