use chrono::{DateTime, Utc};
use playlog_core::clock::target_day;
use playlog_core::{PlayRecord, RawItem};
use playlog_fetch::RecentlyPlayedSource;
use playlog_store::{LoadOutcome, PlayedTracksStore};
use playlog_transform::TransformOutcome;
use tracing::info;

use crate::error::PipelineError;
use crate::outcome::RunOutcome;

/// Fetcher, transformer and loader wired to one source and one store.
///
/// Holds no state between runs; every call to [`Pipeline::run`] is a fresh batch.
pub struct Pipeline {
    source: Box<dyn RecentlyPlayedSource>,
    store: PlayedTracksStore,
}

impl Pipeline {
    pub fn new(source: Box<dyn RecentlyPlayedSource>, store: PlayedTracksStore) -> Self {
        Self { source, store }
    }

    pub fn store(&self) -> &PlayedTracksStore {
        &self.store
    }

    /// Stage 1: one request to the source.
    pub async fn extract(&self, reference: DateTime<Utc>) -> Result<Vec<RawItem>, PipelineError> {
        Ok(self.source.fetch(reference).await?)
    }

    /// Stage 2: validate and keep the target day's plays.
    pub fn transform(
        &self,
        items: &[RawItem],
        reference: DateTime<Utc>,
    ) -> Result<TransformOutcome, PipelineError> {
        Ok(playlog_transform::transform(items, reference)?)
    }

    /// Stage 3: one transaction against the store.
    pub fn load(&self, records: &[PlayRecord]) -> Result<LoadOutcome, PipelineError> {
        Ok(self.store.load(records)?)
    }

    /// Run the three stages for `reference`. Loading is skipped when the
    /// transform ends in an empty outcome.
    pub async fn run(&self, reference: DateTime<Utc>) -> Result<RunOutcome, PipelineError> {
        info!(
            source = self.source.name(),
            reference = %reference,
            target_day = %target_day(reference),
            "run started"
        );

        let items = self.extract(reference).await?;
        let outcome = match self.transform(&items, reference)? {
            TransformOutcome::EmptyBatch => RunOutcome::EmptyBatch,
            TransformOutcome::NoRecordsForTargetDay {
                target_day,
                dropped,
            } => RunOutcome::NoRecordsForTargetDay {
                target_day,
                dropped,
            },
            TransformOutcome::Records { records, dropped } => match self.load(&records)? {
                LoadOutcome::Inserted { rows } => RunOutcome::Loaded { rows, dropped },
                LoadOutcome::AlreadyPresent { conflicting } => RunOutcome::AlreadyPresent {
                    conflicting,
                    dropped,
                },
            },
        };

        info!(summary = %outcome.summary(), "run finished");
        Ok(outcome)
    }
}
