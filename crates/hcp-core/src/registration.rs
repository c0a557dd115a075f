// crates/hcp-core/src/registration.rs
//
// Idempotent node registration.
//
// First registration creates the node and stamps `registered_at`; every later
// registration overwrites the telemetry fields but keeps the original
// `registered_at`. Two concurrent first registrations may both miss on the
// lookup; the store's uniqueness check rejects the loser with `Conflict`,
// which is retried here as an update so the first-seen time survives.

use std::sync::Arc;

use chrono::Utc;
use tracing::Span;

use crate::error::HcpError;
use crate::node::{Node, NodeStatus};
use crate::traits::NodeRepository;

/// Registration protocol over any [`NodeRepository`].
pub struct NodeRegistry<R: ?Sized> {
    repo: Arc<R>,
    span: Span,
}

impl<R: ?Sized> Clone for NodeRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            span: self.span.clone(),
        }
    }
}

impl<R: NodeRepository + ?Sized> NodeRegistry<R> {
    pub fn new(repo: Arc<R>, span: Span) -> Self {
        Self { repo, span }
    }

    /// Create-or-update a node. Returns the node as stored.
    pub async fn register(&self, mut node: Node) -> Result<Node, HcpError> {
        node.validate()?;
        let now = Utc::now();
        node.updated_at = now;

        if let Some(existing) = self.repo.get_node(&node.id).await? {
            node.registered_at = existing.registered_at;
            tracing::debug!(parent: &self.span, node_id = %node.id, "re-registering node");
            return self.repo.update_node(&node).await;
        }

        node.registered_at = now;
        match self.repo.create_node(&node).await {
            Ok(()) => {
                tracing::info!(parent: &self.span, node_id = %node.id, role = %node.role, "registered node");
                Ok(node)
            }
            Err(e) if e.is_conflict() => {
                tracing::warn!(
                    parent: &self.span,
                    node_id = %node.id,
                    "concurrent registration won the create; retrying as update"
                );
                self.repo.update_node(&node).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update_status(&self, id: &str, status: NodeStatus) -> Result<Node, HcpError> {
        let node = self.repo.update_node_status(id, status).await?;
        tracing::debug!(parent: &self.span, node_id = %id, status = %status, "node status updated");
        Ok(node)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Node>, HcpError> {
        self.repo.get_node(id).await
    }
}
