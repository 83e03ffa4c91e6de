//! Reconload
//!
//! Reconciles reconnaissance output (host attributes, GPO attributes,
//! logon sessions, compromise marks) into an existing Active Directory
//! property graph.
//!
//! # Layout
//!
//! - `graph`: property graph model and an in-memory store with JSON snapshots
//! - `gateway`: the narrow graph interface the loader talks to, with an
//!   in-memory backend and a Neo4j HTTP backend
//! - `ingest`: classification, identity resolution, reconciliation and reporting
//! - `config`: loader and connection settings
//!
//! Records only ever touch nodes that already exist. Entities missing from
//! the graph are reported as not found, never created.
//!
//! ## Example Usage
//!
//! ```rust
//! use reconload::gateway::MemoryGateway;
//! use reconload::ingest::{CollectingSink, IngestMode, Ingestor};
//! use reconload::LoaderConfig;
//!
//! let mut gateway = MemoryGateway::default();
//! let host = gateway.store_mut().create_node("Computer");
//! gateway
//!     .store_mut()
//!     .set_node_property(host, "name", "WKSTN01.LAB.LOCAL")
//!     .unwrap();
//!
//! let config = LoaderConfig::new("lab.local", IngestMode::Properties);
//! let mut ingestor = Ingestor::new(&config, &mut gateway, CollectingSink::new());
//! let summary = ingestor
//!     .ingest_str(r#"[{"Name": "wkstn01", "os": "Windows 10"}]"#)
//!     .unwrap();
//! assert_eq!(summary.updated, 1);
//!
//! let node = gateway.store().get_node(host).unwrap();
//! assert_eq!(node.get_property("os").unwrap().as_string(), Some("Windows 10"));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod gateway;
pub mod graph;
pub mod ingest;

// Re-export main types for convenience
pub use config::{LoaderConfig, Neo4jConfig};

pub use gateway::{GatewayError, GatewayResult, GraphGateway, MemoryGateway, Neo4jGateway};

pub use graph::{
    Edge, EdgeId, EdgeType, GraphError, GraphResult, GraphSnapshot, GraphStore, Label, Node,
    NodeId, PropertyMap, PropertyValue, SnapshotError,
};

pub use ingest::{
    CollectingSink, IngestError, IngestMode, IngestSummary, Ingestor, MergeResult, Record,
    ReportSink, TracingSink,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.3.0");
    }
}
