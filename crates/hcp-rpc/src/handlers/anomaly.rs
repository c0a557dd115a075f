// crates/hcp-rpc/src/handlers/anomaly.rs
//
// Anomaly handlers: Create, Get, List, UpdateStatus.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use hcp_core::anomaly::{Anomaly, AnomalyFilter, AnomalyStatus, AnomalyUpdate, Severity};
use hcp_core::error::{parse_uuid, HcpError};
use hcp_core::traits::AnomalyRepository;

use super::{
    non_empty, page_request, parse_optional, parse_optional_uuid, parse_time, PaginationResponse,
    SharedStore,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResponse {
    pub anomaly: Anomaly,
}

// ---------------------------------------------------------------------------
// CreateAnomaly
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnomalyRequest {
    pub benchmark_id: String,
    pub anomaly_type: String,
    pub severity: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub evidence: Map<String, Value>,
    /// RFC 3339; defaults to now.
    #[serde(default)]
    pub detected_at: Option<String>,
}

pub async fn handle_create_anomaly(
    store: &SharedStore,
    request: CreateAnomalyRequest,
) -> Result<AnomalyResponse, HcpError> {
    let benchmark_id = parse_uuid("benchmark_id", &request.benchmark_id)?;
    let severity: Severity = request.severity.parse()?;

    let mut anomaly = Anomaly::new(benchmark_id, request.anomaly_type, severity, request.confidence_score);
    anomaly.transaction_hash = non_empty(request.transaction_hash);
    anomaly.node_id = non_empty(request.node_id);
    anomaly.description = request.description;
    anomaly.evidence = request.evidence;
    if let Some(detected_at) = parse_time("detected_at", request.detected_at)? {
        anomaly.detected_at = detected_at;
    }

    let anomaly = store.create_anomaly(anomaly).await?;
    Ok(AnomalyResponse { anomaly })
}

// ---------------------------------------------------------------------------
// GetAnomaly
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAnomalyRequest {
    pub anomaly_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAnomalyResponse {
    pub found: bool,
    pub anomaly: Option<Anomaly>,
}

pub async fn handle_get_anomaly(
    store: &SharedStore,
    request: GetAnomalyRequest,
) -> Result<GetAnomalyResponse, HcpError> {
    let id = parse_uuid("anomaly_id", &request.anomaly_id)?;
    let anomaly = store.get_anomaly(&id).await?;
    Ok(GetAnomalyResponse {
        found: anomaly.is_some(),
        anomaly,
    })
}

// ---------------------------------------------------------------------------
// ListAnomalies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAnomaliesRequest {
    pub benchmark_id: Option<String>,
    pub node_id: Option<String>,
    pub anomaly_type: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAnomaliesResponse {
    pub anomalies: Vec<Anomaly>,
    pub pagination: PaginationResponse,
}

pub async fn handle_list_anomalies(
    store: &SharedStore,
    request: ListAnomaliesRequest,
) -> Result<ListAnomaliesResponse, HcpError> {
    let filter = AnomalyFilter {
        benchmark_id: parse_optional_uuid("benchmark_id", request.benchmark_id)?,
        node_id: non_empty(request.node_id),
        anomaly_type: non_empty(request.anomaly_type),
        severity: parse_optional(request.severity)?,
        status: parse_optional(request.status)?,
    };
    let page = store
        .list_anomalies(&filter, page_request(request.page, request.page_size))
        .await?;
    Ok(ListAnomaliesResponse {
        pagination: PaginationResponse::from(&page),
        anomalies: page.items,
    })
}

// ---------------------------------------------------------------------------
// UpdateAnomalyStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAnomalyStatusRequest {
    pub anomaly_id: String,
    pub status: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub resolution_notes: Option<String>,
}

pub async fn handle_update_anomaly_status(
    store: &SharedStore,
    request: UpdateAnomalyStatusRequest,
) -> Result<AnomalyResponse, HcpError> {
    let id = parse_uuid("anomaly_id", &request.anomaly_id)?;
    let update = AnomalyUpdate {
        status: request.status.parse::<AnomalyStatus>()?,
        assigned_to: non_empty(request.assigned_to),
        resolution_notes: non_empty(request.resolution_notes),
    };
    let anomaly = store.update_anomaly_status(&id, &update).await?;
    Ok(AnomalyResponse { anomaly })
}
