// crates/hcp-core/src/lib.rs
//
// hcp-core: Entity types, query contract, and repository traits for the HCP
// telemetry server.
//
// This is the leaf crate that every other crate in the workspace depends on.
// It defines the node registry, benchmark, transaction ledger, time-series
// metric, and anomaly entities; the filter/pagination contract shared by
// every listing; the single-pass statistics accumulator; the repository
// capability traits; and the node registration protocol. Entity types carry
// no persistence metadata: the storage schema lives in hcp-store.

pub mod anomaly;
pub mod benchmark;
pub mod error;
pub mod metric;
pub mod node;
pub mod query;
pub mod registration;
pub mod stats;
pub mod traits;
pub mod transaction;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use hcp_core::Node;`

pub use anomaly::{Anomaly, AnomalyFilter, AnomalyStatus, AnomalyUpdate, Severity};
pub use benchmark::{Benchmark, BenchmarkResults, BenchmarkStatus};
pub use metric::{BenchmarkMetricQuery, Metric, MetricKey, NodeMetricQuery};
pub use node::{Node, NodeFilter, NodeRole, NodeStatus};
pub use query::{Filter, Page, PageCollector, PageRequest};
pub use stats::{StatsAccumulator, TransactionStats};
pub use transaction::{BlockRef, Confirmation, Transaction, TransactionFilter, TransactionStatus};

// Error type
pub use error::HcpError;

// Traits and protocols
pub use registration::NodeRegistry;
pub use traits::{
    AnomalyRepository, BenchmarkRepository, MetricRepository, NodeRepository, TelemetryStore,
    TransactionLedger,
};
