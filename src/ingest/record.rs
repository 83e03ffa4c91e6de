//! Record classification
//!
//! Turns loosely typed collection output into typed records. A JSON object
//! may carry several recognised keys and then yields one record per kind;
//! anything unusable becomes a `RecordError`, which the driver reports as a
//! skipped record.

use crate::graph::PropertyValue;
use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;
use thiserror::Error;

/// Incoming properties, in input order
pub type RecordProperties = IndexMap<String, PropertyValue>;

pub const HOST_KEY: &str = "Name";
pub const GPO_KEY: &str = "GPO";
pub const SESSION_HOST_KEY: &str = "Host";
pub const SESSION_USER_KEY: &str = "User";
pub const SESSION_TYPE_KEY: &str = "Type";

/// How an input file is read. Chosen by the caller, never guessed from
/// the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// JSON array; host, GPO and session records
    Properties,
    /// JSON array; session records only
    Sessions,
    /// One name per line; mark as owned
    Owned,
    /// One name per line; clear the owned mark
    Unowned,
}

impl IngestMode {
    /// Plain-line modes read bare names instead of JSON
    pub fn is_plain_line(&self) -> bool {
        matches!(self, IngestMode::Owned | IngestMode::Unowned)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostUpdate {
    pub name: String,
    /// Everything except `Name`
    pub properties: RecordProperties,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpoUpdate {
    pub objectid: String,
    /// Everything except `GPO`
    pub properties: RecordProperties,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionObservation {
    pub host: String,
    pub user: String,
    pub session_type: Option<PropertyValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OwnedMark {
    pub name: String,
    pub owned: bool,
}

/// A classified input record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    HostUpdate(HostUpdate),
    GpoUpdate(GpoUpdate),
    SessionObservation(SessionObservation),
    OwnedMark(OwnedMark),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    HostUpdate,
    GpoUpdate,
    SessionObservation,
    OwnedMark,
    OwnedUnmark,
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::HostUpdate(_) => RecordKind::HostUpdate,
            Record::GpoUpdate(_) => RecordKind::GpoUpdate,
            Record::SessionObservation(_) => RecordKind::SessionObservation,
            Record::OwnedMark(mark) if mark.owned => RecordKind::OwnedMark,
            Record::OwnedMark(_) => RecordKind::OwnedUnmark,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::HostUpdate => "host-update",
            RecordKind::GpoUpdate => "gpo-update",
            RecordKind::SessionObservation => "session-observation",
            RecordKind::OwnedMark => "owned-mark",
            RecordKind::OwnedUnmark => "owned-unmark",
        };
        f.write_str(name)
    }
}

/// Why a record could not be used
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("unrecognized shape")]
    Unrecognized,

    #[error("not a session record")]
    NotSession,

    #[error("missing required key {0:?}")]
    MissingKey(&'static str),

    #[error("key {key:?} holds {found}, expected a string")]
    NotAString { key: &'static str, found: &'static str },
}

fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn string_field(object: &JsonMap<String, JsonValue>, key: &'static str) -> Result<String, RecordError> {
    match object.get(key) {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(other) => Err(RecordError::NotAString { key, found: json_type(other) }),
        None => Err(RecordError::MissingKey(key)),
    }
}

fn properties_except(object: &JsonMap<String, JsonValue>, identity_key: &str) -> RecordProperties {
    object
        .iter()
        .filter(|(k, _)| k.as_str() != identity_key)
        .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
        .collect()
}

fn session(object: &JsonMap<String, JsonValue>) -> Result<Record, RecordError> {
    let session_type = object
        .get(SESSION_TYPE_KEY)
        .filter(|v| !v.is_null())
        .map(PropertyValue::from_json);
    Ok(Record::SessionObservation(SessionObservation {
        host: string_field(object, SESSION_HOST_KEY)?,
        user: string_field(object, SESSION_USER_KEY)?,
        session_type,
    }))
}

/// Classify one element of a JSON-array input.
///
/// Returns one entry per recognised kind; never empty.
pub fn classify(value: &JsonValue, mode: IngestMode) -> Vec<Result<Record, RecordError>> {
    let object = match value.as_object() {
        Some(object) => object,
        None => return vec![Err(RecordError::Unrecognized)],
    };

    if mode == IngestMode::Sessions {
        return if object.contains_key(SESSION_HOST_KEY) {
            vec![session(object)]
        } else {
            vec![Err(RecordError::NotSession)]
        };
    }

    let mut records = Vec::new();
    if object.contains_key(SESSION_HOST_KEY) {
        records.push(session(object));
    }
    if object.contains_key(HOST_KEY) {
        records.push(string_field(object, HOST_KEY).map(|name| {
            Record::HostUpdate(HostUpdate {
                name,
                properties: properties_except(object, HOST_KEY),
            })
        }));
    }
    if object.contains_key(GPO_KEY) {
        records.push(string_field(object, GPO_KEY).map(|objectid| {
            Record::GpoUpdate(GpoUpdate {
                objectid,
                properties: properties_except(object, GPO_KEY),
            })
        }));
    }

    if records.is_empty() {
        records.push(Err(RecordError::Unrecognized));
    }
    records
}

/// Classify one line of a plain-line input. Blank lines yield nothing.
pub fn classify_line(line: &str, owned: bool) -> Option<Record> {
    let name = line.trim();
    if name.is_empty() {
        return None;
    }
    Some(Record::OwnedMark(OwnedMark {
        name: name.to_string(),
        owned,
    }))
}
