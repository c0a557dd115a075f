// crates/hcp-core/src/node.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HcpError;
use crate::query::{eq_opt, Filter};

/// Role a node plays in the consensus protocol under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Leader,
    Validator,
    Follower,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Leader => "leader",
            NodeRole::Validator => "validator",
            NodeRole::Follower => "follower",
        }
    }
}

impl FromStr for NodeRole {
    type Err = HcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leader" => Ok(NodeRole::Leader),
            "validator" => Ok(NodeRole::Validator),
            "follower" => Ok(NodeRole::Follower),
            other => Err(HcpError::Validation(format!("unknown node role: {}", other))),
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Liveness of a node as last reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
    Syncing,
    Failed,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "online",
            NodeStatus::Offline => "offline",
            NodeStatus::Syncing => "syncing",
            NodeStatus::Failed => "failed",
        }
    }
}

impl FromStr for NodeStatus {
    type Err = HcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(NodeStatus::Online),
            "offline" => Ok(NodeStatus::Offline),
            "syncing" => Ok(NodeStatus::Syncing),
            "failed" => Ok(NodeStatus::Failed),
            other => Err(HcpError::Validation(format!("unknown node status: {}", other))),
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant in the benchmarked network.
///
/// `id` is stable and immutable once created; in practice it is the node's
/// network address. `registered_at` is the first-seen time and is never
/// rewritten, not even by a later re-registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub address: String,
    pub public_key: String,
    pub region: String,
    pub role: NodeRole,
    pub status: NodeStatus,
    /// 0..=100.
    pub trust_score: f64,
    pub uptime_percentage: f64,
    pub total_blocks_proposed: u64,
    pub total_blocks_validated: u64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub peers_count: u32,
    pub network_latency_avg: f64,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// A fresh node with the schema defaults: validator, offline, trust 100.
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: String::new(),
            address: address.into(),
            public_key: String::new(),
            region: String::new(),
            role: NodeRole::Validator,
            status: NodeStatus::Offline,
            trust_score: 100.0,
            uptime_percentage: 0.0,
            total_blocks_proposed: 0,
            total_blocks_validated: 0,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            disk_usage: 0.0,
            peers_count: 0,
            network_latency_avg: 0.0,
            last_heartbeat: None,
            registered_at: now,
            updated_at: now,
        }
    }

    /// Reject values the store must never hold.
    pub fn validate(&self) -> Result<(), HcpError> {
        if self.id.trim().is_empty() {
            return Err(HcpError::Validation("node id must not be empty".into()));
        }
        if self.id.contains('\0') {
            return Err(HcpError::Validation("node id must not contain NUL".into()));
        }
        if !(0.0..=100.0).contains(&self.trust_score) {
            return Err(HcpError::Validation(format!(
                "trust score {} outside 0..=100",
                self.trust_score
            )));
        }
        Ok(())
    }
}

/// Predicates for node listings. Results are ordered by id ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFilter {
    pub role: Option<NodeRole>,
    pub status: Option<NodeStatus>,
    pub region: Option<String>,
}

impl Filter<Node> for NodeFilter {
    fn matches(&self, node: &Node) -> bool {
        eq_opt(self.role.as_ref(), &node.role)
            && eq_opt(self.status.as_ref(), &node.status)
            && eq_opt(self.region.as_deref(), node.region.as_str())
    }
}
