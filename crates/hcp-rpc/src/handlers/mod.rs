// crates/hcp-rpc/src/handlers/mod.rs
//
// Handler modules for all RPC endpoints.
// Each module defines request/response types and handler functions
// for a specific API group. The helpers below convert wire values
// (strings, optional pagination) into domain values.

pub mod anomaly;
pub mod benchmark;
pub mod metric;
pub mod node;
pub mod system;
pub mod transaction;

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hcp_core::error::{parse_uuid, HcpError};
use hcp_core::query::{Page, PageRequest};
use hcp_core::traits::TelemetryStore;

/// The store every handler works against.
pub type SharedStore = Arc<dyn TelemetryStore>;

/// Pagination block returned by every list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationResponse {
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u32,
}

impl<T> From<&Page<T>> for PaginationResponse {
    fn from(page: &Page<T>) -> Self {
        Self {
            total_items: page.total_items,
            total_pages: page.total_pages(),
            current_page: page.page,
        }
    }
}

/// Generic acknowledgement for calls with no payload to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: Option<String>,
}

/// Absent or zero values fall back to the defaults.
pub fn page_request(page: Option<u32>, page_size: Option<u32>) -> PageRequest {
    PageRequest::new(page.unwrap_or(0), page_size.unwrap_or(0))
}

/// Treat an absent or blank string as "no constraint".
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse an optional enum filter; blank means unconstrained.
pub fn parse_optional<T>(value: Option<String>) -> Result<Option<T>, HcpError>
where
    T: FromStr<Err = HcpError>,
{
    non_empty(value).map(|v| v.parse()).transpose()
}

pub fn parse_optional_uuid(field: &str, value: Option<String>) -> Result<Option<Uuid>, HcpError> {
    non_empty(value).map(|v| parse_uuid(field, &v)).transpose()
}

/// Parse an RFC 3339 timestamp. Blank means unbounded.
pub fn parse_time(field: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>, HcpError> {
    non_empty(value)
        .map(|v| {
            DateTime::parse_from_rfc3339(v.trim())
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| HcpError::Validation(format!("invalid {} '{}': {}", field, v, e)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcp_core::node::NodeRole;
    use hcp_core::query::paginate;

    #[test]
    fn test_page_request_defaults() {
        let req = page_request(None, Some(0));
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), 10);
    }

    #[test]
    fn test_pagination_response() {
        let page = paginate(0..21, page_request(Some(3), Some(10)));
        let wire = PaginationResponse::from(&page);
        assert_eq!(wire.total_items, 21);
        assert_eq!(wire.total_pages, 3);
        assert_eq!(wire.current_page, 3);
    }

    #[test]
    fn test_blank_filters_are_unconstrained() {
        assert_eq!(parse_optional::<NodeRole>(Some("  ".into())).unwrap(), None);
        assert_eq!(
            parse_optional::<NodeRole>(Some("leader".into())).unwrap(),
            Some(NodeRole::Leader)
        );
        assert!(parse_optional::<NodeRole>(Some("boss".into())).is_err());
        assert_eq!(parse_optional_uuid("benchmark_id", Some(String::new())).unwrap(), None);
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("start_time", Some(String::new())).unwrap(), None);
        let ts = parse_time("start_time", Some("2026-03-01T12:00:00+02:00".into()))
            .unwrap()
            .unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-03-01T10:00:00+00:00");
        let err = parse_time("end_time", Some("yesterday".into())).unwrap_err();
        assert!(matches!(err, HcpError::Validation(_)));
    }
}
