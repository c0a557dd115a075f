// crates/hcp-rpc/src/handlers/metric.rs
//
// Time-series handlers: Report, ReportBatch, GetNodeMetrics, GetBenchmarkMetrics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use hcp_core::error::{parse_uuid, HcpError};
use hcp_core::metric::{BenchmarkMetricQuery, Metric, NodeMetricQuery};
use hcp_core::traits::MetricRepository;

use super::{non_empty, page_request, parse_time, PaginationResponse, SharedStore, StatusResponse};

// ---------------------------------------------------------------------------
// ReportMetric / ReportMetricBatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetricRequest {
    pub node_id: String,
    pub metric_name: String,
    #[serde(alias = "metric_value")]
    pub value: f64,
    #[serde(default, alias = "metric_unit")]
    pub unit: String,
    #[serde(default)]
    pub labels: Map<String, Value>,
    pub benchmark_id: String,
    /// RFC 3339; defaults to now.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ReportMetricRequest {
    fn into_metric(self) -> Result<Metric, HcpError> {
        let benchmark_id = parse_uuid("benchmark_id", &self.benchmark_id)?;
        let mut metric = Metric::new(self.node_id, self.metric_name, self.value, benchmark_id);
        metric.unit = self.unit;
        metric.labels = self.labels;
        if let Some(ts) = parse_time("timestamp", self.timestamp)? {
            metric.timestamp = ts;
        }
        metric.normalize();
        Ok(metric)
    }
}

pub async fn handle_report_metric(
    store: &SharedStore,
    request: ReportMetricRequest,
) -> Result<StatusResponse, HcpError> {
    store.create_metric(&request.into_metric()?).await?;
    Ok(StatusResponse {
        success: true,
        message: None,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetricBatchRequest {
    pub metrics: Vec<ReportMetricRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetricBatchResponse {
    pub success: bool,
    pub accepted: usize,
}

/// Either every sample is stored or none is.
pub async fn handle_report_metric_batch(
    store: &SharedStore,
    request: ReportMetricBatchRequest,
) -> Result<ReportMetricBatchResponse, HcpError> {
    let metrics = request
        .metrics
        .into_iter()
        .map(ReportMetricRequest::into_metric)
        .collect::<Result<Vec<_>, _>>()?;
    store.create_metrics(&metrics).await?;
    Ok(ReportMetricBatchResponse {
        success: true,
        accepted: metrics.len(),
    })
}

// ---------------------------------------------------------------------------
// GetNodeMetrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetricsRequest {
    pub node_id: String,
    #[serde(default)]
    pub metric_name: Option<String>,
    /// Inclusive, RFC 3339; blank is unbounded.
    #[serde(default)]
    pub start_time: Option<String>,
    /// Inclusive, RFC 3339; blank is unbounded.
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub metrics: Vec<Metric>,
    pub pagination: PaginationResponse,
}

pub async fn handle_node_metrics(
    store: &SharedStore,
    request: NodeMetricsRequest,
) -> Result<MetricsResponse, HcpError> {
    let query = NodeMetricQuery {
        node_id: request.node_id,
        metric_name: non_empty(request.metric_name),
        start_time: parse_time("start_time", request.start_time)?,
        end_time: parse_time("end_time", request.end_time)?,
    };
    let page = store
        .node_metrics(&query, page_request(request.page, request.page_size))
        .await?;
    Ok(MetricsResponse {
        pagination: PaginationResponse::from(&page),
        metrics: page.items,
    })
}

// ---------------------------------------------------------------------------
// GetBenchmarkMetrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkMetricsRequest {
    pub benchmark_id: String,
    #[serde(default)]
    pub metric_name: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

pub async fn handle_benchmark_metrics(
    store: &SharedStore,
    request: BenchmarkMetricsRequest,
) -> Result<MetricsResponse, HcpError> {
    let query = BenchmarkMetricQuery {
        benchmark_id: parse_uuid("benchmark_id", &request.benchmark_id)?,
        metric_name: non_empty(request.metric_name),
    };
    let page = store
        .benchmark_metrics(&query, page_request(request.page, request.page_size))
        .await?;
    Ok(MetricsResponse {
        pagination: PaginationResponse::from(&page),
        metrics: page.items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn report(ts: Option<&str>) -> ReportMetricRequest {
        ReportMetricRequest {
            node_id: "n1".into(),
            metric_name: "cpu_usage".into(),
            value: 42.0,
            unit: "%".into(),
            labels: Map::new(),
            benchmark_id: Uuid::now_v7().to_string(),
            timestamp: ts.map(str::to_string),
        }
    }

    #[test]
    fn test_timestamp_truncated_to_micros() {
        let metric = report(Some("2026-05-01T00:00:00.123456789Z")).into_metric().unwrap();
        assert_eq!(metric.timestamp.timestamp_subsec_nanos(), 123_456_000);
    }

    #[test]
    fn test_bad_benchmark_id_is_validation() {
        let mut req = report(None);
        req.benchmark_id = "nope".into();
        assert!(matches!(req.into_metric().unwrap_err(), HcpError::Validation(_)));
    }

    #[test]
    fn test_wire_aliases() {
        let req: ReportMetricRequest = serde_json::from_value(serde_json::json!({
            "node_id": "n1",
            "metric_name": "tps",
            "metric_value": 1500.0,
            "metric_unit": "tx/s",
            "benchmark_id": Uuid::now_v7().to_string(),
        }))
        .unwrap();
        assert_eq!(req.value, 1500.0);
        assert_eq!(req.unit, "tx/s");
        assert!(req.labels.is_empty());
    }
}
