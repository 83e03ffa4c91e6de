//! Record ingestion
//!
//! Three stages per record:
//! - `record`: classify raw input into typed records
//! - `identity`: compute the graph keys a record refers to
//! - `reconcile`: merge, link or mark the matching nodes
//!
//! `driver` runs the stages over a whole input; `report` carries the
//! per-record outcomes out of it.

pub mod driver;
pub mod identity;
pub mod reconcile;
pub mod record;
pub mod report;

pub use driver::{IngestError, IngestResult, Ingestor};
pub use identity::{
    first_match, resolve_gpo, resolve_host, resolve_owned, resolve_session_host,
    resolve_session_user, Identity,
};
pub use reconcile::{MergeResult, MissingSide, NotFoundReason, Reconciler};
pub use record::{
    classify, classify_line, GpoUpdate, HostUpdate, IngestMode, OwnedMark, Record, RecordError,
    RecordKind, RecordProperties, SessionObservation,
};
pub use report::{CollectingSink, IngestSummary, Outcome, ReportSink, TracingSink};
