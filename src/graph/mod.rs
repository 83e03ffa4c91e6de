//! Property graph data model
//!
//! Nodes with labels and properties, directed typed edges (several may join
//! the same pair), an in-memory store and a JSON snapshot format for seeding
//! it with a baseline topology.

pub mod edge;
pub mod node;
pub mod property;
pub mod snapshot;
pub mod store;
pub mod types;

pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use snapshot::{GraphSnapshot, SnapshotError, SnapshotResult};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{EdgeId, EdgeType, Label, NodeId};
