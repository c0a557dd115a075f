// crates/hcp-store/src/keys.rs
//
// Byte-level key encodings. Timestamps are encoded as big-endian microseconds
// with the sign bit flipped, so lexicographic key order equals time order and
// range scans can seek directly to a time bound.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use hcp_core::error::HcpError;
use hcp_core::metric::{Metric, MetricKey};

use crate::schema::KEY_SEPARATOR;

/// Width of an encoded timestamp.
pub const TS_LEN: usize = 8;

pub fn encode_ts(ts: DateTime<Utc>) -> [u8; TS_LEN] {
    ((ts.timestamp_micros() as u64) ^ (1 << 63)).to_be_bytes()
}

pub fn decode_ts(bytes: &[u8]) -> Result<DateTime<Utc>, HcpError> {
    let raw: [u8; TS_LEN] = bytes
        .get(..TS_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| HcpError::Serialization("truncated timestamp key".into()))?;
    let micros = (u64::from_be_bytes(raw) ^ (1 << 63)) as i64;
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| HcpError::Serialization(format!("timestamp out of range: {}", micros)))
}

/// Ledger record key inside a partition: `{submitted_at}{hash}`.
pub fn ledger_key(submitted_at: DateTime<Utc>, hash: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(TS_LEN + hash.len());
    key.extend_from_slice(&encode_ts(submitted_at));
    key.extend_from_slice(hash.as_bytes());
    key
}

/// Ledger index key: `{benchmark_uuid}{submitted_at}{hash}`.
pub fn benchmark_ledger_key(benchmark_id: &Uuid, submitted_at: DateTime<Utc>, hash: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + TS_LEN + hash.len());
    key.extend_from_slice(benchmark_id.as_bytes());
    key.extend_from_slice(&ledger_key(submitted_at, hash));
    key
}

/// Prefix of every metric key belonging to one node: `{node_id}\0`.
pub fn node_metric_prefix(node_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(node_id.len() + 1);
    key.extend_from_slice(node_id.as_bytes());
    key.push(KEY_SEPARATOR);
    key
}

/// Primary metric key: `{node_id}\0{timestamp}{metric_name}`.
pub fn metric_key(key: &MetricKey) -> Vec<u8> {
    let mut out = node_metric_prefix(&key.node_id);
    out.extend_from_slice(&encode_ts(key.timestamp));
    out.extend_from_slice(key.metric_name.as_bytes());
    out
}

/// Secondary key: `{benchmark_uuid}{timestamp}{node_id}\0{metric_name}`.
pub fn benchmark_metric_key(metric: &Metric) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + TS_LEN + metric.node_id.len() + 1 + metric.metric_name.len());
    out.extend_from_slice(metric.benchmark_id.as_bytes());
    out.extend_from_slice(&encode_ts(metric.timestamp));
    out.extend_from_slice(metric.node_id.as_bytes());
    out.push(KEY_SEPARATOR);
    out.extend_from_slice(metric.metric_name.as_bytes());
    out
}

/// Upper bound for a reverse scan over `prefix`: the exclusive successor of
/// `prefix ++ encode_ts(end)`, or of the whole prefix when `end` is absent.
pub fn reverse_seek_key(prefix: &[u8], end: Option<DateTime<Utc>>) -> Vec<u8> {
    let mut key = prefix.to_vec();
    match end {
        Some(end) => {
            let next = (end.timestamp_micros() as u64 ^ (1 << 63)).saturating_add(1);
            key.extend_from_slice(&next.to_be_bytes());
        }
        None => key.extend_from_slice(&[0xFF; TS_LEN + 1]),
    }
    key
}

pub fn uuid_key(id: &Uuid) -> [u8; 16] {
    *id.as_bytes()
}
