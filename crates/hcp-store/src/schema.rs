// crates/hcp-store/src/schema.rs
//
// Declarative storage schema: the column families the RocksDB store opens,
// and what each one holds. Entity types in hcp-core know nothing about this
// layout.
//
//   nodes                  {node_id}                          -> Node (JSON)
//   benchmarks             {benchmark_uuid:16}                -> Benchmark (JSON)
//   tx_index               {hash}                             -> submitted_at (8, sortable)
//   transactions_YYYY_MM   {submitted_at:8}{hash}             -> Transaction (JSON)
//   tx_by_benchmark        {benchmark_uuid:16}{submitted_at:8}{hash}
//                                                             -> ledger record key
//   metrics                {node_id}\0{timestamp:8}{name}     -> Metric (JSON)
//   metrics_by_benchmark   {benchmark_uuid:16}{timestamp:8}{node_id}\0{name}
//                                                             -> primary metrics key
//   anomalies              {anomaly_uuid:16}                  -> Anomaly (JSON)
//
// `tx_index` enforces hash uniqueness across every ledger partition and
// records which month a transaction lives in. `tx_by_benchmark` lets stats,
// benchmark listings and the cascading delete read one run's rows without
// walking the whole ledger. Ledger partitions are created
// on demand (see `partition.rs`), so they are not part of the fixed set.

pub const CF_NODES: &str = "nodes";
pub const CF_BENCHMARKS: &str = "benchmarks";
pub const CF_TX_INDEX: &str = "tx_index";
pub const CF_TX_BY_BENCHMARK: &str = "tx_by_benchmark";
pub const CF_METRICS: &str = "metrics";
pub const CF_METRICS_BY_BENCHMARK: &str = "metrics_by_benchmark";
pub const CF_ANOMALIES: &str = "anomalies";

/// Column families that always exist.
pub const BASE_COLUMN_FAMILIES: &[&str] = &[
    CF_NODES,
    CF_BENCHMARKS,
    CF_TX_INDEX,
    CF_TX_BY_BENCHMARK,
    CF_METRICS,
    CF_METRICS_BY_BENCHMARK,
    CF_ANOMALIES,
];

/// Byte separating a variable-length node id from what follows it.
pub const KEY_SEPARATOR: u8 = 0;
