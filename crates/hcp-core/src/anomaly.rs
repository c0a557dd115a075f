// crates/hcp-core/src/anomaly.rs
//
// Anomaly records are produced by an external detection collaborator; this
// crate only stores them and drives the resolution workflow:
//
//   New --> Investigating --> Resolved
//                       \--> Dismissed

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::HcpError;
use crate::query::{eq_opt, Filter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = HcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(HcpError::Validation(format!("unknown severity: {}", other))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyStatus {
    #[default]
    New,
    Investigating,
    Resolved,
    Dismissed,
}

impl AnomalyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyStatus::New => "new",
            AnomalyStatus::Investigating => "investigating",
            AnomalyStatus::Resolved => "resolved",
            AnomalyStatus::Dismissed => "dismissed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnomalyStatus::Resolved | AnomalyStatus::Dismissed)
    }

    pub fn can_transition_to(&self, next: AnomalyStatus) -> bool {
        matches!(
            (self, next),
            (AnomalyStatus::New, AnomalyStatus::Investigating)
                | (AnomalyStatus::Investigating, AnomalyStatus::Resolved)
                | (AnomalyStatus::Investigating, AnomalyStatus::Dismissed)
        )
    }
}

impl FromStr for AnomalyStatus {
    type Err = HcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(AnomalyStatus::New),
            "investigating" => Ok(AnomalyStatus::Investigating),
            "resolved" => Ok(AnomalyStatus::Resolved),
            "dismissed" => Ok(AnomalyStatus::Dismissed),
            other => Err(HcpError::Validation(format!("unknown anomaly status: {}", other))),
        }
    }
}

impl fmt::Display for AnomalyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flagged irregularity in a benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: Uuid,
    pub anomaly_type: String,
    pub severity: Severity,
    /// 0.0..=1.0.
    pub confidence_score: f64,
    pub transaction_hash: Option<String>,
    pub node_id: Option<String>,
    pub benchmark_id: Uuid,
    pub description: String,
    /// Opaque to this crate; only the detection collaborator interprets it.
    #[serde(default)]
    pub evidence: Map<String, Value>,
    #[serde(default)]
    pub status: AnomalyStatus,
    pub assigned_to: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Anomaly {
    pub fn new(
        benchmark_id: Uuid,
        anomaly_type: impl Into<String>,
        severity: Severity,
        confidence_score: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            anomaly_type: anomaly_type.into(),
            severity,
            confidence_score,
            transaction_hash: None,
            node_id: None,
            benchmark_id,
            description: String::new(),
            evidence: Map::new(),
            status: AnomalyStatus::New,
            assigned_to: None,
            resolved_at: None,
            resolution_notes: None,
            detected_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Assign the id and reset the workflow fields for a fresh record.
    pub fn prepare_for_create(&mut self, now: DateTime<Utc>) -> Uuid {
        if self.id.is_nil() {
            self.id = Uuid::now_v7();
        }
        self.status = AnomalyStatus::New;
        self.resolved_at = None;
        self.created_at = now;
        self.updated_at = now;
        self.id
    }

    pub fn validate(&self) -> Result<(), HcpError> {
        if self.anomaly_type.trim().is_empty() {
            return Err(HcpError::Validation("anomaly_type must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(HcpError::Validation(format!(
                "confidence score {} outside 0.0..=1.0",
                self.confidence_score
            )));
        }
        Ok(())
    }

    /// Advance the resolution workflow.
    pub fn apply_update(&mut self, update: &AnomalyUpdate, now: DateTime<Utc>) -> Result<(), HcpError> {
        if !self.status.can_transition_to(update.status) {
            return Err(HcpError::Validation(format!(
                "anomaly {} cannot move from {} to {}",
                self.id, self.status, update.status
            )));
        }
        self.status = update.status;
        if update.assigned_to.is_some() {
            self.assigned_to = update.assigned_to.clone();
        }
        if update.resolution_notes.is_some() {
            self.resolution_notes = update.resolution_notes.clone();
        }
        if self.status.is_terminal() {
            self.resolved_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }
}

/// A resolution-workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyUpdate {
    pub status: AnomalyStatus,
    pub assigned_to: Option<String>,
    pub resolution_notes: Option<String>,
}

/// Predicates for anomaly listings. Results are ordered by `detected_at`
/// descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFilter {
    pub benchmark_id: Option<Uuid>,
    pub node_id: Option<String>,
    pub anomaly_type: Option<String>,
    pub severity: Option<Severity>,
    pub status: Option<AnomalyStatus>,
}

impl Filter<Anomaly> for AnomalyFilter {
    fn matches(&self, a: &Anomaly) -> bool {
        eq_opt(self.benchmark_id.as_ref(), &a.benchmark_id)
            && self
                .node_id
                .as_deref()
                .map_or(true, |n| a.node_id.as_deref() == Some(n))
            && eq_opt(self.anomaly_type.as_deref(), a.anomaly_type.as_str())
            && eq_opt(self.severity.as_ref(), &a.severity)
            && eq_opt(self.status.as_ref(), &a.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(status: AnomalyStatus) -> AnomalyUpdate {
        AnomalyUpdate {
            status,
            assigned_to: Some("oncall".into()),
            resolution_notes: None,
        }
    }

    #[test]
    fn test_workflow_happy_path() {
        let mut a = Anomaly::new(Uuid::now_v7(), "sybil", Severity::High, 0.95);
        a.prepare_for_create(Utc::now());
        a.apply_update(&update(AnomalyStatus::Investigating), Utc::now()).unwrap();
        assert_eq!(a.assigned_to.as_deref(), Some("oncall"));
        assert!(a.resolved_at.is_none());

        let resolve = AnomalyUpdate {
            status: AnomalyStatus::Resolved,
            assigned_to: None,
            resolution_notes: Some("false positive in load generator".into()),
        };
        a.apply_update(&resolve, Utc::now()).unwrap();
        assert_eq!(a.status, AnomalyStatus::Resolved);
        assert!(a.resolved_at.is_some());
        assert_eq!(a.assigned_to.as_deref(), Some("oncall"));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!AnomalyStatus::New.can_transition_to(AnomalyStatus::Resolved));
        assert!(!AnomalyStatus::Resolved.can_transition_to(AnomalyStatus::Investigating));
        assert!(!AnomalyStatus::Dismissed.can_transition_to(AnomalyStatus::New));
        assert!(AnomalyStatus::Investigating.can_transition_to(AnomalyStatus::Dismissed));
    }

    #[test]
    fn test_confidence_range() {
        let a = Anomaly::new(Uuid::now_v7(), "fork", Severity::Low, 1.5);
        assert!(a.validate().is_err());
    }

    #[test]
    fn test_prepare_resets_workflow() {
        let mut a = Anomaly::new(Uuid::now_v7(), "fork", Severity::Low, 0.5);
        a.status = AnomalyStatus::Resolved;
        a.prepare_for_create(Utc::now());
        assert_eq!(a.status, AnomalyStatus::New);
        assert!(!a.id.is_nil());
    }

    #[test]
    fn test_filter_by_node() {
        let mut a = Anomaly::new(Uuid::now_v7(), "fork", Severity::Low, 0.5);
        let filter = AnomalyFilter {
            node_id: Some("node-003".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&a));
        a.node_id = Some("node-003".into());
        assert!(filter.matches(&a));
    }
}
