//! Ingestion driver: input -> classifier -> reconciler -> sink
//!
//! Records are processed one at a time, to completion, in input order.
//! A gateway error stops the batch; everything else is reported and the
//! loop moves on.

use super::reconcile::{MergeResult, Reconciler};
use super::record::{self, IngestMode, Record, RecordError};
use super::report::{IngestSummary, Outcome, ReportSink};
use crate::config::LoaderConfig;
use crate::gateway::{GatewayError, GraphGateway};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Fatal ingestion errors
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Cannot read input {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input must be a JSON array, found {0}")]
    NotAnArray(&'static str),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Drives one ingestion pass against a gateway, reporting to a sink
pub struct Ingestor<G, S> {
    reconciler: Reconciler<G>,
    sink: S,
    mode: IngestMode,
    summary: IngestSummary,
}

impl<G: GraphGateway, S: ReportSink> Ingestor<G, S> {
    pub fn new(config: &LoaderConfig, gateway: G, sink: S) -> Self {
        Self {
            reconciler: Reconciler::new(gateway, config.domain.as_str()),
            sink,
            mode: config.mode,
            summary: IngestSummary::default(),
        }
    }

    pub fn mode(&self) -> IngestMode {
        self.mode
    }

    /// Counts so far
    pub fn summary(&self) -> IngestSummary {
        self.summary
    }

    /// Read and ingest a file
    pub fn ingest_file(&mut self, path: impl AsRef<Path>) -> IngestResult<IngestSummary> {
        let path = path.as_ref();
        info!("Read {:?}", path);
        let input = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.ingest_str(&input)
    }

    /// Ingest the full text of an input file
    pub fn ingest_str(&mut self, input: &str) -> IngestResult<IngestSummary> {
        match self.mode {
            IngestMode::Owned => self.ingest_lines(input, true)?,
            IngestMode::Unowned => self.ingest_lines(input, false)?,
            IngestMode::Properties | IngestMode::Sessions => {
                let value: JsonValue = serde_json::from_str(input)?;
                self.ingest_json(&value)?
            }
        }
        info!(
            "Ingestion finished: {} updated, {} not found, {} relationships, {} skipped",
            self.summary.updated,
            self.summary.not_found,
            self.summary.relationships_created,
            self.summary.skipped
        );
        Ok(self.summary)
    }

    /// Ingest an already parsed JSON document (must be an array)
    pub fn ingest_json(&mut self, value: &JsonValue) -> IngestResult<()> {
        let items = match value {
            JsonValue::Array(items) => items,
            JsonValue::Object(_) => return Err(IngestError::NotAnArray("an object")),
            _ => return Err(IngestError::NotAnArray("a scalar")),
        };
        debug!("{} records in {:?} mode", items.len(), self.mode);

        for (index, item) in items.iter().enumerate() {
            for classified in record::classify(item, self.mode) {
                self.apply(index, classified, || item.to_string())?;
            }
        }
        Ok(())
    }

    fn ingest_lines(&mut self, input: &str, owned: bool) -> IngestResult<()> {
        for (index, line) in input.lines().enumerate() {
            if let Some(record) = record::classify_line(line, owned) {
                self.apply(index, Ok(record), || line.to_string())?;
            }
        }
        Ok(())
    }

    fn apply(
        &mut self,
        index: usize,
        classified: Result<Record, RecordError>,
        describe: impl FnOnce() -> String,
    ) -> IngestResult<()> {
        let result = match classified {
            Ok(record) => self.reconciler.reconcile(&record)?,
            Err(reason) => MergeResult::Skipped {
                record: describe(),
                reason,
            },
        };
        self.summary.record(&result);
        self.sink.report(&Outcome { index, result });
        Ok(())
    }

    /// Hand back the gateway and sink
    pub fn into_parts(self) -> (G, S) {
        (self.reconciler.into_gateway(), self.sink)
    }
}
