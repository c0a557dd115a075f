// crates/hcp-store/src/lib.rs
//
// hcp-store: Storage backends for the HCP telemetry server.
//
// - `rocks` / `nodes` / `benchmarks` / `ledger` / `metrics` / `anomalies`:
//   the RocksDB store, one column family per table and one per calendar
//   month of the transaction ledger.
// - `memory`: the same contracts over in-process maps.
// - `schema`, `partition`, `keys`: the storage layout itself.

pub mod anomalies;
pub mod benchmarks;
pub mod keys;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod nodes;
pub mod partition;
pub mod rocks;
pub mod schema;

pub use memory::InMemoryStore;
pub use rocks::{RocksStore, StoreConfig, DEFAULT_MAX_METRIC_BATCH};
