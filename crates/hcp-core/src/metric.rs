// crates/hcp-core/src/metric.rs
//
// Time-series samples keyed by the composite natural key
// (timestamp, node_id, metric_name). There is no surrogate id; a second
// insert under an existing key is rejected, never merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::HcpError;
use crate::query::{eq_opt, Filter};

/// One time-series sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub metric_name: String,
    pub value: f64,
    pub unit: String,
    /// Free-form labels; key order carries no meaning.
    #[serde(default)]
    pub labels: Map<String, Value>,
    pub benchmark_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Composite natural key of a [`Metric`].
///
/// Ordered by node, then time, then name: the layout range scans use.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetricKey {
    pub node_id: String,
    pub timestamp: DateTime<Utc>,
    pub metric_name: String,
}

impl Metric {
    pub fn new(
        node_id: impl Into<String>,
        metric_name: impl Into<String>,
        value: f64,
        benchmark_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            timestamp: truncate_to_micros(now),
            node_id: node_id.into(),
            metric_name: metric_name.into(),
            value,
            unit: String::new(),
            labels: Map::new(),
            benchmark_id,
            created_at: now,
        }
    }

    pub fn key(&self) -> MetricKey {
        MetricKey {
            node_id: self.node_id.clone(),
            timestamp: self.timestamp,
            metric_name: self.metric_name.clone(),
        }
    }

    /// Truncate the timestamp to the precision the key is compared at.
    pub fn normalize(&mut self) {
        self.timestamp = truncate_to_micros(self.timestamp);
    }

    pub fn validate(&self) -> Result<(), HcpError> {
        if self.node_id.is_empty() || self.node_id.contains('\0') {
            return Err(HcpError::Validation(format!(
                "invalid metric node_id '{}'",
                self.node_id
            )));
        }
        if self.metric_name.is_empty() {
            return Err(HcpError::Validation("metric_name must not be empty".into()));
        }
        if !self.value.is_finite() {
            return Err(HcpError::Validation(format!(
                "metric {} has non-finite value",
                self.metric_name
            )));
        }
        Ok(())
    }
}

/// Truncate a timestamp to whole microseconds.
pub fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.timestamp_micros()).unwrap_or(ts)
}

/// Range query over one node's samples. Absent fields apply no predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetricQuery {
    pub node_id: String,
    pub metric_name: Option<String>,
    /// Inclusive.
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive.
    pub end_time: Option<DateTime<Utc>>,
}

impl NodeMetricQuery {
    pub fn for_node(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            metric_name: None,
            start_time: None,
            end_time: None,
        }
    }
}

impl Filter<Metric> for NodeMetricQuery {
    fn matches(&self, m: &Metric) -> bool {
        m.node_id == self.node_id
            && eq_opt(self.metric_name.as_deref(), m.metric_name.as_str())
            && self.start_time.map_or(true, |start| m.timestamp >= start)
            && self.end_time.map_or(true, |end| m.timestamp <= end)
    }
}

/// All samples of one benchmark, optionally narrowed to one metric name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetricQuery {
    pub benchmark_id: Uuid,
    pub metric_name: Option<String>,
}

impl Filter<Metric> for BenchmarkMetricQuery {
    fn matches(&self, m: &Metric) -> bool {
        m.benchmark_id == self.benchmark_id
            && eq_opt(self.metric_name.as_deref(), m.metric_name.as_str())
    }
}

/// Contract order for metric listings: most recent first.
pub fn newest_first(a: &Metric, b: &Metric) -> std::cmp::Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.node_id.cmp(&a.node_id))
        .then_with(|| b.metric_name.cmp(&a.metric_name))
}
