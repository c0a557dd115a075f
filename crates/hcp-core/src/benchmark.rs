// crates/hcp-core/src/benchmark.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HcpError;

/// Lifecycle of a benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

impl BenchmarkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkStatus::Running => "running",
            BenchmarkStatus::Completed => "completed",
            BenchmarkStatus::Failed => "failed",
        }
    }
}

impl FromStr for BenchmarkStatus {
    type Err = HcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(BenchmarkStatus::Running),
            "completed" => Ok(BenchmarkStatus::Completed),
            "failed" => Ok(BenchmarkStatus::Failed),
            other => Err(HcpError::Validation(format!("unknown benchmark status: {}", other))),
        }
    }
}

impl fmt::Display for BenchmarkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Results populated while a run progresses.
///
/// Latencies are milliseconds; resource figures are percentages (CPU) or
/// megabytes (memory, disk IO).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResults {
    pub actual_tps: f64,
    pub latency_p50: f64,
    pub latency_p90: f64,
    pub latency_p99: f64,
    pub latency_p999: f64,
    pub latency_avg: f64,
    pub latency_min: f64,
    pub latency_max: f64,

    pub block_count: u64,
    pub transaction_count: u64,
    pub successful_tx: u64,
    pub failed_tx: u64,
    pub block_size_avg: f64,
    pub block_propagation_time: f64,

    pub cpu_usage_avg: f64,
    pub cpu_usage_max: f64,
    pub memory_usage_avg: f64,
    pub memory_usage_max: f64,
    pub network_in_mbps: f64,
    pub network_out_mbps: f64,
    pub disk_io_read: f64,
    pub disk_io_write: f64,

    // Consensus specific.
    pub view_change_count: u64,
    pub prepare_phase_latency: f64,
    pub commit_phase_latency: f64,
}

/// One benchmark run of a consensus algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    /// Assigned once at creation (generated when nil), never reassigned.
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Algorithm tag, e.g. "tPBFT", "Raft", "HotStuff".
    pub algorithm: String,
    pub node_count: u32,
    /// Planned duration in seconds.
    pub duration_secs: u32,
    pub target_tps: u32,
    #[serde(default)]
    pub results: BenchmarkResults,
    #[serde(default)]
    pub status: BenchmarkStatus,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Benchmark {
    /// A new run with a nil id; the store assigns the id on create.
    pub fn new(name: impl Into<String>, algorithm: impl Into<String>, node_count: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            name: name.into(),
            description: String::new(),
            algorithm: algorithm.into(),
            node_count,
            duration_secs: 0,
            target_tps: 0,
            results: BenchmarkResults::default(),
            status: BenchmarkStatus::Running,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Assign a fresh id if none was supplied and stamp creation times.
    ///
    /// Returns the id now carried by the benchmark.
    pub fn prepare_for_create(&mut self, now: DateTime<Utc>) -> Uuid {
        if self.id.is_nil() {
            self.id = Uuid::now_v7();
        }
        self.created_at = now;
        self.updated_at = now;
        self.id
    }

    pub fn validate(&self) -> Result<(), HcpError> {
        if self.name.trim().is_empty() {
            return Err(HcpError::Validation("benchmark name must not be empty".into()));
        }
        if self.algorithm.trim().is_empty() {
            return Err(HcpError::Validation("benchmark algorithm must not be empty".into()));
        }
        Ok(())
    }
}
