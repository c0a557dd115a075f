// crates/hcp-store/src/rocks.rs
//
// RocksDB-backed persistent storage for every HCP entity.
//
// One database, one column family per table (see `schema.rs`), plus one
// column family per calendar month of the transaction ledger. Uniqueness is
// enforced by check-then-insert under `write_latch`; multi-key writes go
// through a single `WriteBatch`, so each repository call is one atomic unit.
// Aggregates and listings read from a snapshot.
//
// The entity-specific halves live in `nodes.rs`, `benchmarks.rs`,
// `ledger.rs`, `metrics.rs` and `anomalies.rs`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{BoundColumnFamily, DBWithThreadMode, MultiThreaded, Options};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::Span;

use hcp_core::error::HcpError;
use hcp_core::traits::TelemetryStore;

use crate::partition::{is_partition_name, month_bounds, partition_name};
use crate::schema::BASE_COLUMN_FAMILIES;

/// Largest metric batch accepted when no configuration says otherwise.
pub const DEFAULT_MAX_METRIC_BATCH: usize = 1000;

/// Tunables for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Batches above this size are rejected before any write.
    pub max_metric_batch: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_metric_batch: DEFAULT_MAX_METRIC_BATCH,
        }
    }
}

pub(crate) type Db = DBWithThreadMode<MultiThreaded>;

/// Shared state behind every clone of a [`RocksStore`].
pub(crate) struct StoreInner {
    pub(crate) db: Db,
    /// Serialises check-then-insert sequences.
    write_latch: Mutex<()>,
    /// Ledger partitions known to exist.
    pub(crate) partitions: RwLock<BTreeSet<String>>,
    pub(crate) config: StoreConfig,
    pub(crate) span: Span,
    path: String,
}

/// RocksDB store implementing every repository trait in `hcp-core`.
///
/// Cloning is cheap; clones share the same database handle.
#[derive(Clone)]
pub struct RocksStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.inner.path)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl RocksStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory and any missing column family.
    pub fn open(path: &str) -> Result<Self, HcpError> {
        Self::open_with_span(path, StoreConfig::default(), Span::none())
    }

    /// Open with explicit configuration and a logging handle that every
    /// event of this store is recorded under.
    pub fn open_with_span(path: &str, config: StoreConfig, span: Span) -> Result<Self, HcpError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        // RocksDB refuses to open a database unless every column family on
        // disk is named, so open all of them. Only the ones that look like
        // ledger partitions enter the catalogue.
        let existing = Db::list_cf(&opts, path).unwrap_or_default();
        let partitions: BTreeSet<String> = existing
            .iter()
            .filter(|name| is_partition_name(name))
            .cloned()
            .collect();

        let mut families: BTreeSet<String> = BASE_COLUMN_FAMILIES.iter().map(|s| s.to_string()).collect();
        families.extend(existing);

        let db = Db::open_cf(&opts, path, &families).map_err(|e| {
            HcpError::StoreUnavailable(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        tracing::info!(
            parent: &span,
            path = %path,
            partitions = partitions.len(),
            "opened telemetry store"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                db,
                write_latch: Mutex::new(()),
                partitions: RwLock::new(partitions),
                config,
                span,
                path: path.to_string(),
            }),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Names of the ledger partitions provisioned so far, oldest first.
    pub fn partitions(&self) -> Result<Vec<String>, HcpError> {
        Ok(self.inner.read_partitions()?.into_iter().collect())
    }

    /// Run a synchronous store operation on the blocking pool.
    pub(crate) async fn run<T, F>(&self, op: F) -> Result<T, HcpError>
    where
        T: Send + 'static,
        F: FnOnce(&StoreInner) -> Result<T, HcpError> + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| HcpError::StoreUnavailable(format!("store task failed: {}", e)))?
    }
}

impl StoreInner {
    /// Look up a column family handle by name.
    pub(crate) fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>, HcpError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| HcpError::StoreUnavailable(format!("missing column family {}", name)))
    }

    pub(crate) fn latch(&self) -> Result<MutexGuard<'_, ()>, HcpError> {
        self.write_latch
            .lock()
            .map_err(|_| HcpError::StoreUnavailable("write latch poisoned".into()))
    }

    pub(crate) fn read_partitions(&self) -> Result<BTreeSet<String>, HcpError> {
        self.partitions
            .read()
            .map(|set| set.clone())
            .map_err(|_| HcpError::StoreUnavailable("partition catalogue poisoned".into()))
    }

    /// Make sure the ledger partition for the month of `submitted_at` exists
    /// and return its name.
    ///
    /// Check-then-create. A creation that fails because another writer got
    /// there first counts as success.
    pub(crate) fn ensure_partition(&self, submitted_at: DateTime<Utc>) -> Result<String, HcpError> {
        let partition = partition_name(submitted_at);
        let name = partition.as_str();
        {
            let known = self
                .partitions
                .read()
                .map_err(|_| HcpError::StoreUnavailable("partition catalogue poisoned".into()))?;
            if known.contains(name) {
                return Ok(name.to_string());
            }
        }

        let mut known = self
            .partitions
            .write()
            .map_err(|_| HcpError::StoreUnavailable("partition catalogue poisoned".into()))?;
        if known.contains(name) {
            return Ok(name.to_string());
        }

        match self.db.create_cf(name, &Options::default()) {
            Ok(()) => {
                let (start, end) = month_bounds(submitted_at);
                tracing::info!(
                    parent: &self.span,
                    partition = %name,
                    from = %start,
                    until = %end,
                    "provisioned ledger partition"
                );
            }
            Err(e) if self.db.cf_handle(name).is_some() => {
                tracing::warn!(
                    parent: &self.span,
                    partition = %name,
                    error = %e,
                    "ledger partition already existed; continuing"
                );
            }
            Err(e) => {
                tracing::error!(parent: &self.span, partition = %name, error = %e, "partition provisioning failed");
                return Err(storage_err("create_cf", e));
            }
        }
        known.insert(name.to_string());
        Ok(name.to_string())
    }

    pub(crate) fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>, HcpError> {
        let handle = self.cf(cf)?;
        match self.db.get_cf(&handle, key).map_err(|e| storage_err("get", e))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn put_json<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<(), HcpError> {
        let handle = self.cf(cf)?;
        let json = serde_json::to_vec(value)?;
        self.db
            .put_cf(&handle, key, json)
            .map_err(|e| storage_err("put", e))
    }

    pub(crate) fn exists(&self, cf: &str, key: &[u8]) -> Result<bool, HcpError> {
        let handle = self.cf(cf)?;
        self.db
            .get_pinned_cf(&handle, key)
            .map(|v| v.is_some())
            .map_err(|e| storage_err("get", e))
    }

    /// Decode every value of a column family, in key order, from one snapshot.
    pub(crate) fn scan_json<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>, HcpError> {
        let handle = self.cf(cf)?;
        let snapshot = self.db.snapshot();
        let mut rows = Vec::new();
        for item in snapshot.iterator_cf(&handle, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(|e| storage_err("iterate", e))?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }
}

/// Map a RocksDB failure to the infrastructure error variant.
pub(crate) fn storage_err(op: &str, e: rocksdb::Error) -> HcpError {
    HcpError::StoreUnavailable(format!("RocksDB {} failed: {}", op, e))
}

#[async_trait]
impl TelemetryStore for RocksStore {
    async fn ping(&self) -> Result<(), HcpError> {
        self.run(|inner| {
            inner
                .db
                .property_int_value("rocksdb.estimate-num-keys")
                .map(|_| ())
                .map_err(|e| storage_err("property", e))
        })
        .await
    }
}
