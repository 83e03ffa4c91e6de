//! Edge implementation for the property graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, NodeId};
use serde::{Deserialize, Serialize};

/// A directed edge in the property graph
///
/// Any number of edges may join the same pair of nodes, including edges of
/// the same type; session observations rely on that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,

    /// Source node (edge goes FROM this node)
    pub source: NodeId,

    /// Target node (edge goes TO this node)
    pub target: NodeId,

    /// Relationship type (e.g. "HasSession", "AdminTo")
    pub edge_type: EdgeType,

    /// Properties associated with this edge
    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Edge {
    /// Create a new directed edge
    pub fn new(id: EdgeId, source: NodeId, target: NodeId, edge_type: impl Into<EdgeType>) -> Self {
        Self::new_with_properties(id, source, target, edge_type, PropertyMap::new())
    }

    /// Create a new edge with properties
    pub fn new_with_properties(
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> Self {
        Edge {
            id,
            source,
            target,
            edge_type: edge_type.into(),
            properties,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Check if this edge goes FROM `source` TO `target`
    pub fn links(&self, source: NodeId, target: NodeId) -> bool {
        self.source == source && self.target == target
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

impl std::hash::Hash for Edge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_edge() {
        let edge = Edge::new(EdgeId::new(1), NodeId::new(1), NodeId::new(2), "HasSession");

        assert_eq!(edge.id, EdgeId::new(1));
        assert_eq!(edge.edge_type.as_str(), "HasSession");
        assert!(edge.links(NodeId::new(1), NodeId::new(2)));
        assert!(!edge.links(NodeId::new(2), NodeId::new(1)));
    }

    #[test]
    fn test_edge_properties() {
        let mut edge = Edge::new(EdgeId::new(3), NodeId::new(1), NodeId::new(2), "HasSession");
        edge.set_property("type", "interactive");
        assert_eq!(edge.get_property("type").unwrap().as_string(), Some("interactive"));
        assert!(edge.get_property("missing").is_none());
    }

    #[test]
    fn test_parallel_edges_are_distinct() {
        let a = NodeId::new(100);
        let b = NodeId::new(200);
        let first = Edge::new(EdgeId::new(1), a, b, "HasSession");
        let second = Edge::new(EdgeId::new(2), a, b, "HasSession");

        assert_ne!(first, second);
        assert!(first.links(a, b) && second.links(a, b));
    }
}
