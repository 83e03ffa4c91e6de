//! MemoryGateway: gateway over an in-process graph store

use super::{GatewayError, GatewayResult, GraphGateway};
use crate::graph::{EdgeType, GraphSnapshot, GraphStore, Label, Node, PropertyMap, PropertyValue};
use tracing::debug;

/// In-process gateway. No network; every call goes straight to the store.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    store: GraphStore,
}

impl MemoryGateway {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }

    /// Seed the gateway from a snapshot
    pub fn from_snapshot(snapshot: GraphSnapshot) -> crate::graph::SnapshotResult<Self> {
        Ok(Self::new(snapshot.into_store()?))
    }

    /// Read access to the underlying store
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Write access to the underlying store (seeding, tests)
    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::from_store(&self.store)
    }

    pub fn into_store(self) -> GraphStore {
        self.store
    }
}

impl GraphGateway for MemoryGateway {
    fn find_node(
        &mut self,
        label: Option<&Label>,
        filters: &[(&str, PropertyValue)],
    ) -> GatewayResult<Option<Node>> {
        Ok(self.store.find_nodes(label, filters).into_iter().next().cloned())
    }

    fn merge_nodes(&mut self, nodes: &[&Node]) -> GatewayResult<()> {
        for node in nodes {
            if !self.store.has_node(node.id) {
                debug!("Merging detached node {}", node.id);
                self.store.insert_node((*node).clone())?;
            }
        }
        Ok(())
    }

    fn create_relationship(
        &mut self,
        from: &Node,
        to: &Node,
        rel_type: &EdgeType,
        properties: PropertyMap,
    ) -> GatewayResult<()> {
        let edge_id = self
            .store
            .create_edge_with_properties(from.id, to.id, rel_type.clone(), properties)?;
        debug!("Created {} {} -> {} as {}", rel_type, from.id, to.id, edge_id);
        Ok(())
    }

    fn push(&mut self, node: &Node, keys: &[String]) -> GatewayResult<()> {
        let stored = self
            .store
            .get_node_mut(node.id)
            .ok_or(GatewayError::NodeGone(node.id))?;
        for key in keys {
            match node.get_property(key) {
                Some(value) if !value.is_null() => {
                    stored.set_property(key.clone(), value.clone());
                }
                _ => {
                    stored.remove_property(key);
                }
            }
        }
        Ok(())
    }
}
