// crates/hcp-rpc/src/handlers/node.rs
//
// Node registry handlers: Register, Get, List, UpdateStatus, Topology.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use hcp_core::error::HcpError;
use hcp_core::node::{Node, NodeFilter, NodeRole, NodeStatus};
use hcp_core::registration::NodeRegistry;
use hcp_core::traits::{NodeRepository, TelemetryStore};

use super::{non_empty, page_request, parse_optional, PaginationResponse, SharedStore};

/// Page size used when the topology endpoint lists every node.
pub const TOPOLOGY_PAGE_SIZE: u32 = 1000;

/// Response carrying a single node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResponse {
    pub node: Node,
}

// ---------------------------------------------------------------------------
// RegisterNode
// ---------------------------------------------------------------------------

/// Announce a node and its current telemetry. Safe to repeat.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterNodeRequest {
    /// Stable id; the address is used when blank.
    pub id: Option<String>,
    pub address: String,
    pub name: String,
    pub public_key: String,
    pub region: String,
    /// Defaults to "validator".
    pub role: Option<String>,
    /// Defaults to "online".
    pub status: Option<String>,
    pub trust_score: Option<f64>,
    pub uptime_percentage: Option<f64>,
    pub total_blocks_proposed: Option<u64>,
    pub total_blocks_validated: Option<u64>,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub disk_usage: Option<f64>,
    pub peers_count: Option<u32>,
    pub network_latency_avg: Option<f64>,
}

impl RegisterNodeRequest {
    fn into_node(self) -> Result<Node, HcpError> {
        let id = non_empty(self.id).unwrap_or_else(|| self.address.clone());
        let mut node = Node::new(id, self.address);
        node.name = self.name;
        node.public_key = self.public_key;
        node.region = self.region;
        node.role = parse_optional::<NodeRole>(self.role)?.unwrap_or(NodeRole::Validator);
        node.status = parse_optional::<NodeStatus>(self.status)?.unwrap_or(NodeStatus::Online);
        node.trust_score = self.trust_score.unwrap_or(node.trust_score);
        node.uptime_percentage = self.uptime_percentage.unwrap_or_default();
        node.total_blocks_proposed = self.total_blocks_proposed.unwrap_or_default();
        node.total_blocks_validated = self.total_blocks_validated.unwrap_or_default();
        node.cpu_usage = self.cpu_usage.unwrap_or_default();
        node.memory_usage = self.memory_usage.unwrap_or_default();
        node.disk_usage = self.disk_usage.unwrap_or_default();
        node.peers_count = self.peers_count.unwrap_or_default();
        node.network_latency_avg = self.network_latency_avg.unwrap_or_default();
        node.last_heartbeat = Some(Utc::now());
        Ok(node)
    }
}

pub async fn handle_register_node(
    registry: &NodeRegistry<dyn TelemetryStore>,
    request: RegisterNodeRequest,
) -> Result<NodeResponse, HcpError> {
    let node = registry.register(request.into_node()?).await?;
    Ok(NodeResponse { node })
}

// ---------------------------------------------------------------------------
// GetNode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetNodeRequest {
    pub node_id: String,
}

/// `found` is false (and `node` null) when the id is unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetNodeResponse {
    pub found: bool,
    pub node: Option<Node>,
}

pub async fn handle_get_node(store: &SharedStore, request: GetNodeRequest) -> Result<GetNodeResponse, HcpError> {
    let node = store.get_node(&request.node_id).await?;
    Ok(GetNodeResponse {
        found: node.is_some(),
        node,
    })
}

// ---------------------------------------------------------------------------
// ListNodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListNodesRequest {
    pub role: Option<String>,
    pub status: Option<String>,
    pub region: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNodesResponse {
    pub nodes: Vec<Node>,
    pub pagination: PaginationResponse,
}

pub async fn handle_list_nodes(store: &SharedStore, request: ListNodesRequest) -> Result<ListNodesResponse, HcpError> {
    let filter = NodeFilter {
        role: parse_optional(request.role)?,
        status: parse_optional(request.status)?,
        region: non_empty(request.region),
    };
    let page = store
        .list_nodes(&filter, page_request(request.page, request.page_size))
        .await?;
    Ok(ListNodesResponse {
        pagination: PaginationResponse::from(&page),
        nodes: page.items,
    })
}

// ---------------------------------------------------------------------------
// UpdateNodeStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNodeStatusRequest {
    pub node_id: String,
    pub status: String,
}

pub async fn handle_update_node_status(
    registry: &NodeRegistry<dyn TelemetryStore>,
    request: UpdateNodeStatusRequest,
) -> Result<NodeResponse, HcpError> {
    let status: NodeStatus = request.status.parse()?;
    let node = registry.update_status(&request.node_id, status).await?;
    Ok(NodeResponse { node })
}

// ---------------------------------------------------------------------------
// GetNetworkTopology
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyResponse {
    pub nodes: Vec<Node>,
    pub total_nodes: u64,
}

pub async fn handle_topology(store: &SharedStore, _request: TopologyRequest) -> Result<TopologyResponse, HcpError> {
    let page = store
        .list_nodes(&NodeFilter::default(), page_request(Some(1), Some(TOPOLOGY_PAGE_SIZE)))
        .await?;
    Ok(TopologyResponse {
        total_nodes: page.total_items,
        nodes: page.items,
    })
}
