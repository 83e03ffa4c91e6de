//! Node implementation for the property graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A node in the property graph
///
/// Nodes carry:
/// - A unique ID
/// - One or more labels (`Computer`, `User`, `GPO`, ...)
/// - Properties (key-value pairs)
/// - Creation and update timestamps
///
/// Gateways hand out owned copies of nodes; mutating one changes nothing in
/// the graph until it is pushed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,

    /// Labels of this node
    pub labels: BTreeSet<Label>,

    /// Properties associated with this node
    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Node {
    /// Create a new node with a single label
    pub fn new(id: NodeId, label: impl Into<Label>) -> Self {
        Self::new_with_properties(id, vec![label.into()], PropertyMap::new())
    }

    /// Create a new node with labels and properties
    pub fn new_with_properties(id: NodeId, labels: Vec<Label>, properties: PropertyMap) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Node {
            id,
            labels: labels.into_iter().collect(),
            properties,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a label to this node
    pub fn add_label(&mut self, label: impl Into<Label>) {
        if self.labels.insert(label.into()) {
            self.touch();
        }
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// Set a property value, returning the previous one
    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        let old = self.properties.insert(key.into(), value.into());
        self.touch();
        old
    }

    /// Remove a property, returning its value
    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        let old = self.properties.remove(key);
        if old.is_some() {
            self.touch();
        }
        old
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Check if property exists
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// The `name` property, if it is a string
    pub fn name(&self) -> Option<&str> {
        self.get_property("name").and_then(PropertyValue::as_string)
    }

    /// True when every `(key, value)` filter equals the node's property
    pub fn matches(&self, filters: &[(&str, PropertyValue)]) -> bool {
        filters
            .iter()
            .all(|(key, value)| self.properties.get(*key) == Some(value))
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
