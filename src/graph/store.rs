//! In-memory graph storage
//!
//! Holds the baseline topology (computers, users, GPOs and their
//! relationships) when ingesting offline, and backs the test gateway.

use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, Label, NodeId};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Node {0} already exists")]
    NodeAlreadyExists(NodeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("Node id {0} is out of range (max {max})", max = MAX_NODE_ID)]
    NodeIdOutOfRange(u64),
}

/// Largest node id accepted from outside. Neo4j ids are signed 64-bit, so
/// anything above `i64::MAX` cannot come from a real export.
pub const MAX_NODE_ID: u64 = i64::MAX as u64;

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory graph storage
///
/// Layout:
/// - nodes: NodeId -> Node, ordered (ids come from snapshots and can be sparse)
/// - edges: EdgeId -> Edge, arena (ids are always assigned here)
/// - outgoing / incoming: NodeId -> adjacency list
/// - label_index: Label -> node ids, kept ordered so lookups are deterministic
#[derive(Debug)]
pub struct GraphStore {
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Option<Edge>>,
    outgoing: FxHashMap<NodeId, Vec<EdgeId>>,
    incoming: FxHashMap<NodeId, Vec<EdgeId>>,
    label_index: FxHashMap<Label, BTreeSet<NodeId>>,
    edge_type_index: FxHashMap<EdgeType, BTreeSet<EdgeId>>,
    next_node_id: u64,
    next_edge_id: u64,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            outgoing: FxHashMap::default(),
            incoming: FxHashMap::default(),
            label_index: FxHashMap::default(),
            edge_type_index: FxHashMap::default(),
            next_node_id: 1,
            next_edge_id: 1,
        }
    }

    /// Create a node with auto-generated ID and single label
    pub fn create_node(&mut self, label: impl Into<Label>) -> NodeId {
        self.create_node_with_properties(vec![label.into()], PropertyMap::new())
    }

    /// Create a node with labels and properties
    pub fn create_node_with_properties(
        &mut self,
        labels: Vec<Label>,
        properties: PropertyMap,
    ) -> NodeId {
        let node_id = NodeId::new(self.next_node_id);
        self.next_node_id += 1;
        self.place_node(Node::new_with_properties(node_id, labels, properties));
        node_id
    }

    /// Insert a node under its own id (snapshot loading, gateway merges).
    pub fn insert_node(&mut self, node: Node) -> GraphResult<()> {
        let raw = node.id.as_u64();
        let next = raw
            .checked_add(1)
            .filter(|_| raw <= MAX_NODE_ID)
            .ok_or(GraphError::NodeIdOutOfRange(raw))?;
        if self.has_node(node.id) {
            return Err(GraphError::NodeAlreadyExists(node.id));
        }
        self.next_node_id = self.next_node_id.max(next);
        self.place_node(node);
        Ok(())
    }

    fn place_node(&mut self, node: Node) {
        for label in &node.labels {
            self.label_index.entry(label.clone()).or_default().insert(node.id);
        }
        self.nodes.insert(node.id, node);
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable node by ID
    ///
    /// Property edits through this handle are fine; label edits must go
    /// through `add_label_to_node` or the label index goes stale.
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Check if a node exists
    pub fn has_node(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    /// Set a single property on a node
    pub fn set_node_property(
        &mut self,
        node_id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        let node = self.get_node_mut(node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        Ok(node.set_property(key, value))
    }

    /// Add a label to an existing node and update the label index
    pub fn add_label_to_node(&mut self, node_id: NodeId, label: impl Into<Label>) -> GraphResult<()> {
        let label = label.into();
        let node = self.get_node_mut(node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        node.add_label(label.clone());
        self.label_index.entry(label).or_default().insert(node_id);
        Ok(())
    }

    /// Create an edge between two nodes
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
    ) -> GraphResult<EdgeId> {
        self.create_edge_with_properties(source, target, edge_type, PropertyMap::new())
    }

    /// Create an edge with properties. Never deduplicates.
    pub fn create_edge_with_properties(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        if !self.has_node(source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !self.has_node(target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        let edge_id = EdgeId::new(self.next_edge_id);
        self.next_edge_id += 1;
        let idx = edge_id.as_u64() as usize;

        let edge_type = edge_type.into();
        self.edge_type_index
            .entry(edge_type.clone())
            .or_default()
            .insert(edge_id);
        self.outgoing.entry(source).or_default().push(edge_id);
        self.incoming.entry(target).or_default().push(edge_id);

        if idx >= self.edges.len() {
            self.edges.resize(idx + 1, None);
        }
        self.edges[idx] = Some(Edge::new_with_properties(
            edge_id, source, target, edge_type, properties,
        ));

        Ok(edge_id)
    }

    /// Get an edge by ID
    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.as_u64() as usize)?.as_ref()
    }

    /// Get all outgoing edges from a node
    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.adjacent(&self.outgoing, node_id)
    }

    /// Get all incoming edges to a node
    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.adjacent(&self.incoming, node_id)
    }

    fn adjacent<'a>(&'a self, lists: &'a FxHashMap<NodeId, Vec<EdgeId>>, node_id: NodeId) -> Vec<&'a Edge> {
        lists
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Get all nodes with a specific label, in id order
    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        self.label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|&id| self.get_node(id)).collect())
            .unwrap_or_default()
    }

    /// Get all edges of a specific type, in id order
    pub fn get_edges_by_type(&self, edge_type: &EdgeType) -> Vec<&Edge> {
        self.edge_type_index
            .get(edge_type)
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Find nodes matching every property filter, optionally restricted to
    /// a label. Results are in ascending id order.
    pub fn find_nodes(&self, label: Option<&Label>, filters: &[(&str, PropertyValue)]) -> Vec<&Node> {
        let candidates = match label {
            Some(label) => self.get_nodes_by_label(label),
            None => self.all_nodes(),
        };
        candidates.into_iter().filter(|n| n.matches(filters)).collect()
    }

    /// Get total number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.iter().flatten().count()
    }

    /// All nodes in id order
    pub fn all_nodes(&self) -> Vec<&Node> {
        self.nodes.values().collect()
    }

    /// All edges in id order
    pub fn all_edges(&self) -> Vec<&Edge> {
        self.edges.iter().flatten().collect()
    }

    /// Clear all data from the graph
    pub fn clear(&mut self) {
        *self = GraphStore::new();
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn computer(store: &mut GraphStore, name: &str) -> NodeId {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), name.into());
        store.create_node_with_properties(vec![Label::new("Computer")], props)
    }

    #[test]
    fn test_create_and_get_node() {
        let mut store = GraphStore::new();
        let id = store.create_node("User");
        assert_eq!(id, NodeId::new(1));
        assert!(store.has_node(id));
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_create_node_with_properties() {
        let mut store = GraphStore::new();
        let id = computer(&mut store, "DC01.LAB.LOCAL");
        let node = store.get_node(id).unwrap();
        assert_eq!(node.name(), Some("DC01.LAB.LOCAL"));
        assert!(node.has_label(&Label::new("Computer")));
    }

    #[test]
    fn test_edge_validation() {
        let mut store = GraphStore::new();
        let node = store.create_node("Computer");
        let missing = NodeId::new(999);

        assert_eq!(
            store.create_edge(missing, node, "HasSession"),
            Err(GraphError::InvalidEdgeSource(missing))
        );
        assert_eq!(
            store.create_edge(node, missing, "HasSession"),
            Err(GraphError::InvalidEdgeTarget(missing))
        );
    }

    #[test]
    fn test_adjacency_lists() {
        let mut store = GraphStore::new();
        let host = store.create_node("Computer");
        let alice = store.create_node("User");
        let bob = store.create_node("User");

        store.create_edge(host, alice, "HasSession").unwrap();
        store.create_edge(host, bob, "HasSession").unwrap();
        store.create_edge(alice, host, "AdminTo").unwrap();

        assert_eq!(store.get_outgoing_edges(host).len(), 2);
        assert_eq!(store.get_incoming_edges(host).len(), 1);
        assert_eq!(store.get_incoming_edges(bob).len(), 1);
        assert!(store.get_outgoing_edges(NodeId::new(42)).is_empty());
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        let mut store = GraphStore::new();
        let host = store.create_node("Computer");
        let user = store.create_node("User");

        let first = store.create_edge(host, user, "HasSession").unwrap();
        let second = store.create_edge(host, user, "HasSession").unwrap();

        assert_ne!(first, second);
        assert_eq!(store.get_edges_by_type(&EdgeType::new("HasSession")).len(), 2);
    }

    #[test]
    fn test_find_nodes_by_label_and_property() {
        let mut store = GraphStore::new();
        let dc = computer(&mut store, "DC01.LAB.LOCAL");
        computer(&mut store, "WKSTN01.LAB.LOCAL");
        let user = store.create_node("User");
        store.set_node_property(user, "name", "DC01.LAB.LOCAL").unwrap();

        let found = store.find_nodes(Some(&Label::new("Computer")), &[("name", "DC01.LAB.LOCAL".into())]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, dc);

        let any = store.find_nodes(None, &[("name", "DC01.LAB.LOCAL".into())]);
        assert_eq!(any.iter().map(|n| n.id).collect::<Vec<_>>(), vec![dc, user]);
    }

    #[test]
    fn test_insert_node_keeps_id_and_advances_counter() {
        let mut store = GraphStore::new();
        store.insert_node(Node::new(NodeId::new(10), "User")).unwrap();
        assert_eq!(
            store.insert_node(Node::new(NodeId::new(10), "User")),
            Err(GraphError::NodeAlreadyExists(NodeId::new(10)))
        );

        let next = store.create_node("User");
        assert_eq!(next, NodeId::new(11));
        assert_eq!(store.get_nodes_by_label(&Label::new("User")).len(), 2);
    }

    #[test]
    fn test_default_store_numbers_from_one() {
        let mut store = GraphStore::default();
        assert_eq!(store.create_node("Computer"), NodeId::new(1));
        assert_eq!(GraphStore::new().create_node("Computer"), NodeId::new(1));
    }

    #[test]
    fn test_sparse_and_oversized_ids() {
        let mut store = GraphStore::new();
        let far = NodeId::new(1_000_000_000_000);
        store.insert_node(Node::new(far, "Computer")).unwrap();
        let near = store.create_node("User");
        store.create_edge(near, far, "HasSession").unwrap();

        assert_eq!(near, NodeId::new(1_000_000_000_001));
        assert_eq!(store.get_outgoing_edges(near).len(), 1);
        assert_eq!(store.all_nodes().iter().map(|n| n.id).collect::<Vec<_>>(), vec![far, near]);

        assert_eq!(
            store.insert_node(Node::new(NodeId::new(u64::MAX), "User")),
            Err(GraphError::NodeIdOutOfRange(u64::MAX))
        );
        assert_eq!(
            store.insert_node(Node::new(NodeId::new(MAX_NODE_ID + 1), "User")),
            Err(GraphError::NodeIdOutOfRange(MAX_NODE_ID + 1))
        );
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn test_add_label_to_node() {
        let mut store = GraphStore::new();
        let id = store.create_node("Base");
        store.add_label_to_node(id, "Computer").unwrap();
        assert_eq!(store.get_nodes_by_label(&Label::new("Computer")).len(), 1);
        assert!(store.add_label_to_node(NodeId::new(9), "User").is_err());
    }

    #[test]
    fn test_clear() {
        let mut store = GraphStore::new();
        let a = store.create_node("User");
        let b = store.create_node("Computer");
        store.create_edge(b, a, "HasSession").unwrap();
        store.clear();

        assert_eq!(store.node_count(), 0);
        assert_eq!(store.edge_count(), 0);
        assert_eq!(store.create_node("User"), NodeId::new(1));
    }
}
