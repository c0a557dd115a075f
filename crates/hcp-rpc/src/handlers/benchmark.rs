// crates/hcp-rpc/src/handlers/benchmark.rs
//
// Benchmark run handlers: Create, Get, List, Update, Delete.

use serde::{Deserialize, Serialize};

use hcp_core::benchmark::{Benchmark, BenchmarkResults, BenchmarkStatus};
use hcp_core::error::{parse_uuid, HcpError};
use hcp_core::traits::BenchmarkRepository;

use super::{page_request, parse_optional, parse_time, PaginationResponse, SharedStore, StatusResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResponse {
    pub benchmark: Benchmark,
}

// ---------------------------------------------------------------------------
// CreateBenchmark
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBenchmarkRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub algorithm: String,
    #[serde(default)]
    pub node_count: u32,
    /// Planned duration in seconds.
    #[serde(default, alias = "duration")]
    pub duration_secs: u32,
    #[serde(default)]
    pub target_tps: u32,
}

pub async fn handle_create_benchmark(
    store: &SharedStore,
    request: CreateBenchmarkRequest,
) -> Result<BenchmarkResponse, HcpError> {
    let mut benchmark = Benchmark::new(request.name, request.algorithm, request.node_count);
    benchmark.description = request.description;
    benchmark.duration_secs = request.duration_secs;
    benchmark.target_tps = request.target_tps;

    let benchmark = store.create_benchmark(benchmark).await?;
    Ok(BenchmarkResponse { benchmark })
}

// ---------------------------------------------------------------------------
// GetBenchmark
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBenchmarkRequest {
    pub benchmark_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBenchmarkResponse {
    pub found: bool,
    pub benchmark: Option<Benchmark>,
}

pub async fn handle_get_benchmark(
    store: &SharedStore,
    request: GetBenchmarkRequest,
) -> Result<GetBenchmarkResponse, HcpError> {
    let id = parse_uuid("benchmark_id", &request.benchmark_id)?;
    let benchmark = store.get_benchmark(&id).await?;
    Ok(GetBenchmarkResponse {
        found: benchmark.is_some(),
        benchmark,
    })
}

// ---------------------------------------------------------------------------
// ListBenchmarks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListBenchmarksRequest {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBenchmarksResponse {
    pub benchmarks: Vec<Benchmark>,
    pub pagination: PaginationResponse,
}

pub async fn handle_list_benchmarks(
    store: &SharedStore,
    request: ListBenchmarksRequest,
) -> Result<ListBenchmarksResponse, HcpError> {
    let page = store
        .list_benchmarks(page_request(request.page, request.page_size))
        .await?;
    Ok(ListBenchmarksResponse {
        pagination: PaginationResponse::from(&page),
        benchmarks: page.items,
    })
}

// ---------------------------------------------------------------------------
// UpdateBenchmark
// ---------------------------------------------------------------------------

/// Partial update: absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBenchmarkRequest {
    pub benchmark_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub results: Option<BenchmarkResults>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

pub async fn handle_update_benchmark(
    store: &SharedStore,
    request: UpdateBenchmarkRequest,
) -> Result<BenchmarkResponse, HcpError> {
    let id = parse_uuid("benchmark_id", &request.benchmark_id)?;
    let mut benchmark = store
        .get_benchmark(&id)
        .await?
        .ok_or_else(|| HcpError::NotFound(format!("benchmark {}", id)))?;

    if let Some(name) = request.name {
        benchmark.name = name;
    }
    if let Some(description) = request.description {
        benchmark.description = description;
    }
    if let Some(status) = parse_optional::<BenchmarkStatus>(request.status)? {
        benchmark.status = status;
    }
    if let Some(results) = request.results {
        benchmark.results = results;
    }
    if request.error_message.is_some() {
        benchmark.error_message = request.error_message;
    }
    if let Some(started_at) = parse_time("started_at", request.started_at)? {
        benchmark.started_at = Some(started_at);
    }
    if let Some(completed_at) = parse_time("completed_at", request.completed_at)? {
        benchmark.completed_at = Some(completed_at);
    }

    let benchmark = store.update_benchmark(&benchmark).await?;
    Ok(BenchmarkResponse { benchmark })
}

// ---------------------------------------------------------------------------
// DeleteBenchmark
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBenchmarkRequest {
    pub benchmark_id: String,
}

/// Runs are kept for later analysis; the call is acknowledged but deletes
/// nothing.
pub async fn handle_delete_benchmark(
    _store: &SharedStore,
    request: DeleteBenchmarkRequest,
) -> Result<StatusResponse, HcpError> {
    let id = parse_uuid("benchmark_id", &request.benchmark_id)?;
    tracing::debug!(benchmark_id = %id, "benchmark delete acknowledged without removal");
    Ok(StatusResponse {
        success: true,
        message: Some("benchmark runs are retained".to_string()),
    })
}
