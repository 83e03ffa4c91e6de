//! Outcome reporting

use super::reconcile::MergeResult;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one classified record. `index` is the position of the source
/// element in the input (array index or line number, zero-based).
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub index: usize,
    pub result: MergeResult,
}

/// Receives every outcome, once, in input order
pub trait ReportSink {
    fn report(&mut self, outcome: &Outcome);
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn report(&mut self, outcome: &Outcome) {
        (**self).report(outcome)
    }
}

/// Logs outcomes through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn report(&mut self, outcome: &Outcome) {
        match &outcome.result {
            MergeResult::Skipped { .. } => warn!("#{} {}", outcome.index, outcome.result),
            result => info!("#{} {}", outcome.index, result),
        }
    }
}

/// Keeps outcomes in memory
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub outcomes: Vec<Outcome>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> impl Iterator<Item = &MergeResult> {
        self.outcomes.iter().map(|o| &o.result)
    }
}

impl ReportSink for CollectingSink {
    fn report(&mut self, outcome: &Outcome) {
        self.outcomes.push(outcome.clone());
    }
}

/// Per-outcome counts for a finished batch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub outcomes: usize,
    pub updated: usize,
    pub not_found: usize,
    pub relationships_created: usize,
    pub skipped: usize,
}

impl IngestSummary {
    pub fn record(&mut self, result: &MergeResult) {
        self.outcomes += 1;
        match result {
            MergeResult::Updated { .. } => self.updated += 1,
            MergeResult::NotFound { .. } => self.not_found += 1,
            MergeResult::RelationshipCreated { .. } => self.relationships_created += 1,
            MergeResult::Skipped { .. } => self.skipped += 1,
        }
    }
}
