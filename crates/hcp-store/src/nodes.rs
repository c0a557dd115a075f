// crates/hcp-store/src/nodes.rs
//
// Node registry on RocksDB. Keys are raw node ids, so a forward scan of the
// column family yields nodes in id order.

use async_trait::async_trait;
use chrono::Utc;

use hcp_core::error::HcpError;
use hcp_core::node::{Node, NodeFilter, NodeStatus};
use hcp_core::query::{paginate, Filter, Page, PageRequest};
use hcp_core::traits::NodeRepository;

use crate::rocks::{RocksStore, StoreInner};
use crate::schema::CF_NODES;

impl StoreInner {
    fn create_node_sync(&self, node: &Node) -> Result<(), HcpError> {
        node.validate()?;
        let _latch = self.latch()?;
        if self.exists(CF_NODES, node.id.as_bytes())? {
            return Err(HcpError::Conflict(format!("node {} already registered", node.id)));
        }
        self.put_json(CF_NODES, node.id.as_bytes(), node)?;
        tracing::debug!(parent: &self.span, node_id = %node.id, "node created");
        Ok(())
    }

    pub(crate) fn get_node_sync(&self, id: &str) -> Result<Option<Node>, HcpError> {
        self.get_json(CF_NODES, id.as_bytes())
    }

    fn update_node_sync(&self, node: &Node) -> Result<Node, HcpError> {
        node.validate()?;
        let _latch = self.latch()?;
        let existing: Node = self
            .get_json(CF_NODES, node.id.as_bytes())?
            .ok_or_else(|| HcpError::NotFound(format!("node {}", node.id)))?;

        let mut stored = node.clone();
        stored.registered_at = existing.registered_at;
        self.put_json(CF_NODES, stored.id.as_bytes(), &stored)?;
        Ok(stored)
    }

    fn update_node_status_sync(&self, id: &str, status: NodeStatus) -> Result<Node, HcpError> {
        let _latch = self.latch()?;
        let mut node: Node = self
            .get_json(CF_NODES, id.as_bytes())?
            .ok_or_else(|| HcpError::NotFound(format!("node {}", id)))?;
        node.status = status;
        node.updated_at = Utc::now();
        self.put_json(CF_NODES, id.as_bytes(), &node)?;
        Ok(node)
    }
}

#[async_trait]
impl NodeRepository for RocksStore {
    async fn create_node(&self, node: &Node) -> Result<(), HcpError> {
        let node = node.clone();
        self.run(move |inner| inner.create_node_sync(&node)).await
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>, HcpError> {
        let id = id.to_string();
        self.run(move |inner| inner.get_node_sync(&id)).await
    }

    async fn list_nodes(&self, filter: &NodeFilter, page: PageRequest) -> Result<Page<Node>, HcpError> {
        let filter = filter.clone();
        self.run(move |inner| {
            let nodes: Vec<Node> = inner.scan_json(CF_NODES)?;
            Ok(paginate(nodes.into_iter().filter(|n| filter.matches(n)), page))
        })
        .await
    }

    async fn update_node(&self, node: &Node) -> Result<Node, HcpError> {
        let node = node.clone();
        self.run(move |inner| inner.update_node_sync(&node)).await
    }

    async fn update_node_status(&self, id: &str, status: NodeStatus) -> Result<Node, HcpError> {
        let id = id.to_string();
        self.run(move |inner| inner.update_node_status_sync(&id, status)).await
    }
}
