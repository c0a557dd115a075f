// crates/hcp-rpc/src/handlers/system.rs
//
// Health handler.

use serde::{Deserialize, Serialize};

use hcp_core::error::HcpError;
use hcp_core::traits::TelemetryStore;

use super::SharedStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy".
    pub status: String,
    pub storage_ok: bool,
    pub version: String,
    pub details: Option<String>,
}

/// Report store reachability. A failing store is reported, not raised.
pub async fn handle_health(store: &SharedStore, _request: HealthRequest) -> Result<HealthResponse, HcpError> {
    let (storage_ok, details) = match store.ping().await {
        Ok(()) => (true, None),
        Err(e) => {
            tracing::error!(error = %e, "health check: store unreachable");
            (false, Some(e.to_string()))
        }
    };

    Ok(HealthResponse {
        status: if storage_ok { "healthy" } else { "unhealthy" }.to_string(),
        storage_ok,
        version: env!("CARGO_PKG_VERSION").to_string(),
        details,
    })
}
