//! Reconciler: applies classified records to existing graph nodes
//!
//! Absence of a target node is an ordinary outcome (`NotFound`); the
//! record sets routinely mention entities the baseline graph never had.
//! Only gateway failures are errors.

use super::identity::{self, first_match, Identity};
use super::record::{GpoUpdate, HostUpdate, OwnedMark, Record, RecordError, RecordProperties, SessionObservation};
use crate::gateway::{GatewayResult, GraphGateway};
use crate::graph::{EdgeType, Label, Node, PropertyMap, PropertyValue};
use std::fmt;
use tracing::debug;

pub const COMPUTER_LABEL: &str = "Computer";
pub const USER_LABEL: &str = "User";
pub const GPO_LABEL: &str = "GPO";
pub const HAS_SESSION: &str = "HasSession";
pub const OWNED_PROPERTY: &str = "owned";

/// Which end of a session edge was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSide {
    Computer,
    User,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No Computer under any host candidate
    NoComputer,
    /// No GPO with that objectid
    NoGpo,
    /// No node of any label with that name
    NoNode,
    /// Session endpoint(s) absent
    SessionEndpoint(MissingSide),
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::NoComputer => write!(f, "no matching Computer"),
            NotFoundReason::NoGpo => write!(f, "no matching GPO"),
            NotFoundReason::NoNode => write!(f, "no node with that name"),
            NotFoundReason::SessionEndpoint(MissingSide::Computer) => write!(f, "session computer missing"),
            NotFoundReason::SessionEndpoint(MissingSide::User) => write!(f, "session user missing"),
            NotFoundReason::SessionEndpoint(MissingSide::Both) => {
                write!(f, "session computer and user missing")
            }
        }
    }
}

/// Outcome of reconciling one record
#[derive(Debug, Clone, PartialEq)]
pub enum MergeResult {
    /// Node found and persisted; `changed` lists keys whose value differs
    /// from what the node held before.
    Updated { key: Identity, changed: Vec<String> },
    NotFound { key: Identity, reason: NotFoundReason },
    RelationshipCreated { from: Identity, to: Identity, rel_type: EdgeType },
    Skipped { record: String, reason: RecordError },
}

impl fmt::Display for MergeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeResult::Updated { key, changed } if changed.is_empty() => {
                write!(f, "updated {} (no changes)", key)
            }
            MergeResult::Updated { key, changed } => {
                write!(f, "updated {} [{}]", key, changed.join(", "))
            }
            MergeResult::NotFound { key, reason } => write!(f, "not found {}: {}", key, reason),
            MergeResult::RelationshipCreated { from, to, rel_type } => {
                write!(f, "created {} -[{}]-> {}", from, rel_type, to)
            }
            MergeResult::Skipped { record, reason } => write!(f, "skipped {}: {}", record, reason),
        }
    }
}

/// Keys a record writes, in input order
fn record_keys(properties: &RecordProperties) -> Vec<String> {
    properties.keys().cloned().collect()
}

/// Copy `properties` onto the node. Keys not mentioned are left alone.
/// Returns the keys whose value changed; a null counts as no value.
fn merge_properties(node: &mut Node, properties: &RecordProperties) -> Vec<String> {
    properties
        .iter()
        .filter_map(|(key, value)| {
            let old = node.set_property(key.clone(), value.clone());
            let before = old.as_ref().filter(|v| !v.is_null());
            let after = Some(value).filter(|v| !v.is_null());
            (before != after).then(|| key.clone())
        })
        .collect()
}

/// Applies records to the graph behind `G`
pub struct Reconciler<G> {
    gateway: G,
    domain: String,
}

impl<G: GraphGateway> Reconciler<G> {
    pub fn new(gateway: G, domain: impl Into<String>) -> Self {
        Self {
            gateway,
            domain: domain.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn into_gateway(self) -> G {
        self.gateway
    }

    /// Dispatch a classified record to its operation
    pub fn reconcile(&mut self, record: &Record) -> GatewayResult<MergeResult> {
        match record {
            Record::HostUpdate(update) => self.update_host(update),
            Record::GpoUpdate(update) => self.update_gpo(update),
            Record::SessionObservation(observation) => self.create_session(observation),
            Record::OwnedMark(mark) => self.mark_owned(mark),
        }
    }

    fn find_by(&mut self, label: Option<&Label>, key: &str, identity: &Identity) -> GatewayResult<Option<Node>> {
        self.gateway.find_node(label, &[(key, PropertyValue::from(identity))])
    }

    /// Merge host properties into the first Computer matching the qualified
    /// or bare host name.
    pub fn update_host(&mut self, update: &HostUpdate) -> GatewayResult<MergeResult> {
        let computer = Label::new(COMPUTER_LABEL);
        let candidates = identity::resolve_host(&update.name, &self.domain);

        let hit = first_match(&candidates, |candidate| {
            self.find_by(Some(&computer), "name", candidate)
        })?;

        match hit {
            Some((key, mut node)) => {
                let changed = merge_properties(&mut node, &update.properties);
                self.gateway.push(&node, &record_keys(&update.properties))?;
                debug!("Updated {}", key);
                Ok(MergeResult::Updated { key, changed })
            }
            None => {
                let key = candidates.last().cloned().unwrap_or_else(|| Identity::new(""));
                debug!("No Computer matches {}", key);
                Ok(MergeResult::NotFound {
                    key,
                    reason: NotFoundReason::NoComputer,
                })
            }
        }
    }

    /// Merge properties into the GPO whose objectid equals the record's
    pub fn update_gpo(&mut self, update: &GpoUpdate) -> GatewayResult<MergeResult> {
        let key = identity::resolve_gpo(&update.objectid);
        let gpo = Label::new(GPO_LABEL);

        match self.find_by(Some(&gpo), "objectid", &key)? {
            Some(mut node) => {
                let changed = merge_properties(&mut node, &update.properties);
                self.gateway.push(&node, &record_keys(&update.properties))?;
                debug!("Updated {}", key);
                Ok(MergeResult::Updated { key, changed })
            }
            None => {
                debug!("No GPO matches {}", key);
                Ok(MergeResult::NotFound {
                    key,
                    reason: NotFoundReason::NoGpo,
                })
            }
        }
    }

    /// Append a HasSession edge from the Computer to the User when both exist.
    ///
    /// Repeated observations append repeated edges.
    pub fn create_session(&mut self, observation: &SessionObservation) -> GatewayResult<MergeResult> {
        let host_key = identity::resolve_session_host(&observation.host, &self.domain);
        let user_key = identity::resolve_session_user(&observation.user, &self.domain);

        let computer = self.find_by(Some(&Label::new(COMPUTER_LABEL)), "name", &host_key)?;
        let user = self.find_by(Some(&Label::new(USER_LABEL)), "name", &user_key)?;

        let (computer, user) = match (computer, user) {
            (Some(computer), Some(user)) => (computer, user),
            (None, Some(_)) => return Ok(missing_endpoint(host_key, MissingSide::Computer)),
            (Some(_), None) => return Ok(missing_endpoint(user_key, MissingSide::User)),
            (None, None) => return Ok(missing_endpoint(host_key, MissingSide::Both)),
        };

        let mut properties = PropertyMap::new();
        if let Some(session_type) = &observation.session_type {
            properties.insert("type".to_string(), session_type.clone());
        }

        let rel_type = EdgeType::new(HAS_SESSION);
        self.gateway.merge_nodes(&[&computer, &user])?;
        self.gateway.create_relationship(&computer, &user, &rel_type, properties)?;
        debug!("Created {} from {} to {}", rel_type, host_key, user_key);

        Ok(MergeResult::RelationshipCreated {
            from: host_key,
            to: user_key,
            rel_type,
        })
    }

    /// Set or clear the `owned` flag on the node named `UPPER(name)`,
    /// whatever its label.
    pub fn mark_owned(&mut self, mark: &OwnedMark) -> GatewayResult<MergeResult> {
        let key = identity::resolve_owned(&mark.name);

        match self.find_by(None, "name", &key)? {
            Some(mut node) => {
                let old = node.set_property(OWNED_PROPERTY, mark.owned);
                self.gateway.push(&node, &[OWNED_PROPERTY.to_string()])?;
                debug!("Updated {} (owned={})", key, mark.owned);
                let changed = if old.and_then(|v| v.as_boolean()) == Some(mark.owned) {
                    Vec::new()
                } else {
                    vec![OWNED_PROPERTY.to_string()]
                };
                Ok(MergeResult::Updated { key, changed })
            }
            None => {
                debug!("No node named {}", key);
                Ok(MergeResult::NotFound {
                    key,
                    reason: NotFoundReason::NoNode,
                })
            }
        }
    }
}

fn missing_endpoint(key: Identity, side: MissingSide) -> MergeResult {
    debug!("Session endpoint missing: {} ({:?})", key, side);
    MergeResult::NotFound {
        key,
        reason: NotFoundReason::SessionEndpoint(side),
    }
}
