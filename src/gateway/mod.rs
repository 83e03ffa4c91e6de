//! Graph Gateway: the read/write surface the reconciler needs from a graph
//!
//! Implemented by:
//! - `MemoryGateway`: wraps an in-process `GraphStore` (offline runs, tests)
//! - `Neo4jGateway`: talks to a Neo4j server over its HTTP endpoint
//!
//! Every call is synchronous and self-contained; the gateway is the only
//! place that serializes access to the target graph.

pub mod memory;
pub mod neo4j;

use crate::graph::{EdgeType, GraphError, Label, Node, NodeId, PropertyMap, PropertyValue};
use thiserror::Error;

pub use memory::MemoryGateway;
pub use neo4j::Neo4jGateway;

/// Errors raised by a gateway. Any of these aborts an ingestion batch.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Could not reach the database (after retries)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The database refused a statement
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// Label or relationship type that cannot be used as a Cypher identifier
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// The node vanished between lookup and write
    #[error("Node {0} no longer exists")]
    NodeGone(NodeId),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Access to the target graph.
///
/// Nodes are returned as owned copies. Callers edit the copy and `push` it
/// back; nothing changes in the graph in between.
pub trait GraphGateway {
    /// First node (lowest id) carrying `label`, or any label when `None`,
    /// whose properties equal every filter.
    fn find_node(
        &mut self,
        label: Option<&Label>,
        filters: &[(&str, PropertyValue)],
    ) -> GatewayResult<Option<Node>>;

    /// Make sure the given, already identified nodes are present. Nodes that
    /// already exist are left exactly as they are.
    fn merge_nodes(&mut self, nodes: &[&Node]) -> GatewayResult<()>;

    /// Append a new relationship. Existing identical relationships are not
    /// looked at.
    fn create_relationship(
        &mut self,
        from: &Node,
        to: &Node,
        rel_type: &EdgeType,
        properties: PropertyMap,
    ) -> GatewayResult<()>;

    /// Persist the properties named in `keys` from the node copy onto the
    /// stored node. Other stored properties are not written. A key whose
    /// value is `Null` (or absent from the copy) is removed, as Neo4j does
    /// for `SET n += {k: null}`.
    fn push(&mut self, node: &Node, keys: &[String]) -> GatewayResult<()>;
}

impl<G: GraphGateway + ?Sized> GraphGateway for &mut G {
    fn find_node(
        &mut self,
        label: Option<&Label>,
        filters: &[(&str, PropertyValue)],
    ) -> GatewayResult<Option<Node>> {
        (**self).find_node(label, filters)
    }

    fn merge_nodes(&mut self, nodes: &[&Node]) -> GatewayResult<()> {
        (**self).merge_nodes(nodes)
    }

    fn create_relationship(
        &mut self,
        from: &Node,
        to: &Node,
        rel_type: &EdgeType,
        properties: PropertyMap,
    ) -> GatewayResult<()> {
        (**self).create_relationship(from, to, rel_type, properties)
    }

    fn push(&mut self, node: &Node, keys: &[String]) -> GatewayResult<()> {
        (**self).push(node, keys)
    }
}

impl<G: GraphGateway + ?Sized> GraphGateway for Box<G> {
    fn find_node(
        &mut self,
        label: Option<&Label>,
        filters: &[(&str, PropertyValue)],
    ) -> GatewayResult<Option<Node>> {
        (**self).find_node(label, filters)
    }

    fn merge_nodes(&mut self, nodes: &[&Node]) -> GatewayResult<()> {
        (**self).merge_nodes(nodes)
    }

    fn create_relationship(
        &mut self,
        from: &Node,
        to: &Node,
        rel_type: &EdgeType,
        properties: PropertyMap,
    ) -> GatewayResult<()> {
        (**self).create_relationship(from, to, rel_type, properties)
    }

    fn push(&mut self, node: &Node, keys: &[String]) -> GatewayResult<()> {
        (**self).push(node, keys)
    }
}
