// crates/hcp-core/src/error.rs

use thiserror::Error;
use uuid::Uuid;

/// Error taxonomy shared by every repository and the request boundary.
#[derive(Debug, Error)]
pub enum HcpError {
    /// Keyed lookup found nothing. Only narrow updates surface this as an
    /// error; plain gets return `Ok(None)` instead.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation (transaction hash, node id, metric key).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed input or a broken foreign relation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Infrastructure failure: the store could not be reached or failed mid-operation.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The operation was abandoned because its deadline expired.
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl HcpError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, HcpError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, HcpError::NotFound(_))
    }
}

impl From<serde_json::Error> for HcpError {
    fn from(e: serde_json::Error) -> Self {
        HcpError::Serialization(e.to_string())
    }
}

/// Parse a textual identifier into a UUID, naming the offending field on failure.
pub fn parse_uuid(field: &str, value: &str) -> Result<Uuid, HcpError> {
    Uuid::parse_str(value.trim())
        .map_err(|e| HcpError::Validation(format!("invalid {} '{}': {}", field, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uuid_rejects_garbage() {
        let err = parse_uuid("benchmark_id", "not-a-uuid").unwrap_err();
        assert!(matches!(err, HcpError::Validation(_)));
        assert!(err.to_string().contains("benchmark_id"));
    }

    #[test]
    fn test_parse_uuid_accepts_hyphenated() {
        let id = Uuid::now_v7();
        assert_eq!(parse_uuid("id", &id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_predicates() {
        assert!(HcpError::Conflict("x".into()).is_conflict());
        assert!(!HcpError::Validation("x".into()).is_conflict());
        assert!(HcpError::NotFound("x".into()).is_not_found());
    }
}
