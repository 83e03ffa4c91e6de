//! JSON snapshot of a graph store
//!
//! The baseline topology for offline runs is seeded from a snapshot file
//! and the reconciled graph can be written back the same way. Properties
//! are plain JSON, so snapshots can be written by hand or exported from
//! another tool.

use super::property::{PropertyMap, PropertyValue};
use super::store::{GraphError, GraphStore};
use super::types::{Label, NodeId};
use super::Node;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Cannot access snapshot {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Inconsistent snapshot: {0}")]
    Graph(#[from] GraphError),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotNode {
    pub id: u64,
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: JsonMap<String, JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotEdge {
    pub source: u64,
    pub target: u64,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(default)]
    pub properties: JsonMap<String, JsonValue>,
}

/// Serializable form of a whole graph
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub edges: Vec<SnapshotEdge>,
}

fn to_property_map(properties: &JsonMap<String, JsonValue>) -> PropertyMap {
    properties
        .iter()
        .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
        .collect()
}

fn to_json_map(properties: &PropertyMap) -> JsonMap<String, JsonValue> {
    properties.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

impl GraphSnapshot {
    /// Read a snapshot from disk
    pub fn load(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: GraphSnapshot = serde_json::from_str(&text)?;
        info!(
            "Loaded snapshot {:?}: {} nodes, {} edges",
            path,
            snapshot.nodes.len(),
            snapshot.edges.len()
        );
        Ok(snapshot)
    }

    /// Write the snapshot to disk as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> SnapshotResult<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Wrote snapshot {:?}", path);
        Ok(())
    }

    /// Build a graph store; node ids are preserved, edge ids are reassigned.
    pub fn into_store(self) -> SnapshotResult<GraphStore> {
        let mut store = GraphStore::new();
        for node in &self.nodes {
            let labels = node.labels.iter().map(|l| Label::new(l.as_str())).collect();
            store.insert_node(Node::new_with_properties(
                NodeId::new(node.id),
                labels,
                to_property_map(&node.properties),
            ))?;
        }
        for edge in &self.edges {
            store.create_edge_with_properties(
                NodeId::new(edge.source),
                NodeId::new(edge.target),
                edge.edge_type.as_str(),
                to_property_map(&edge.properties),
            )?;
        }
        Ok(store)
    }

    /// Capture the current contents of a graph store
    pub fn from_store(store: &GraphStore) -> Self {
        let nodes = store
            .all_nodes()
            .into_iter()
            .map(|node| SnapshotNode {
                id: node.id.as_u64(),
                labels: node.labels.iter().map(|l| l.to_string()).collect(),
                properties: to_json_map(&node.properties),
            })
            .collect();
        let edges = store
            .all_edges()
            .into_iter()
            .map(|edge| SnapshotEdge {
                source: edge.source.as_u64(),
                target: edge.target.as_u64(),
                edge_type: edge.edge_type.to_string(),
                properties: to_json_map(&edge.properties),
            })
            .collect();
        GraphSnapshot { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> GraphSnapshot {
        serde_json::from_value(json!({
            "nodes": [
                {"id": 1, "labels": ["Computer"], "properties": {"name": "WKSTN01.LAB.LOCAL", "enabled": true}},
                {"id": 5, "labels": ["User"], "properties": {"name": "ALICE@LAB.LOCAL"}}
            ],
            "edges": [
                {"source": 5, "target": 1, "type": "AdminTo"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_into_store_preserves_node_ids() {
        let store = sample().into_store().unwrap();
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.get_node(NodeId::new(5)).unwrap().name(), Some("ALICE@LAB.LOCAL"));
        assert_eq!(store.get_outgoing_edges(NodeId::new(5)).len(), 1);
    }

    #[test]
    fn test_dangling_edge_is_rejected() {
        let mut snapshot = sample();
        snapshot.edges.push(SnapshotEdge {
            source: 1,
            target: 99,
            edge_type: "HasSession".to_string(),
            properties: JsonMap::new(),
        });
        assert!(matches!(
            snapshot.into_store(),
            Err(SnapshotError::Graph(GraphError::InvalidEdgeTarget(_)))
        ));
    }

    #[test]
    fn test_duplicate_node_id_is_rejected() {
        let mut snapshot = sample();
        let duplicate = snapshot.nodes[0].clone();
        snapshot.nodes.push(duplicate);
        assert!(matches!(
            snapshot.into_store(),
            Err(SnapshotError::Graph(GraphError::NodeAlreadyExists(_)))
        ));
    }

    #[test]
    fn test_oversized_node_id_is_rejected() {
        let snapshot: GraphSnapshot = serde_json::from_value(json!({
            "nodes": [{"id": u64::MAX, "labels": ["Computer"], "properties": {}}]
        }))
        .unwrap();
        assert!(matches!(
            snapshot.into_store(),
            Err(SnapshotError::Graph(GraphError::NodeIdOutOfRange(u64::MAX)))
        ));

        let exported: GraphSnapshot = serde_json::from_value(json!({
            "nodes": [{"id": 1_000_000_000_000u64, "labels": ["Computer"], "properties": {}}]
        }))
        .unwrap();
        assert_eq!(exported.into_store().unwrap().node_count(), 1);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        let store = sample().into_store().unwrap();
        GraphSnapshot::from_store(&store).save(&path).unwrap();

        let reloaded = GraphSnapshot::load(&path).unwrap();
        assert_eq!(reloaded.nodes.len(), 2);
        assert_eq!(reloaded.edges[0].edge_type, "AdminTo");
        assert_eq!(reloaded.nodes[0].properties["enabled"], json!(true));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GraphSnapshot::load("/nonexistent/graph.json").unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }
}
