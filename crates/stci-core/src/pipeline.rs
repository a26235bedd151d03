//! Pipeline orchestration.
//!
//! Collection: fetch -> archive raw -> drift-check -> dedupe -> validate ->
//! store. Indexing: load stored observations -> compute -> store. Both run
//! once per date; a re-run replaces the day's files wholesale.

use crate::dedup::deduplicate;
use crate::drift::{detect_drift, DriftReport};
use crate::error::PipelineError;
use crate::indexer::{DailyIndexOutput, Indexer};
use crate::observation::Observation;
use crate::sources::PriceSource;
use crate::storage::{self, StorageBackend};
use crate::validate::{validate_observations, validate_raw};
use chrono::NaiveDate;
use tracing::{error, info, warn};

/// Per-run bookkeeping reported back to the caller.
#[derive(Debug, Clone)]
pub struct CollectionSummary {
    pub date: NaiveDate,
    /// (source_id, observation count) per source; failed sources report 0.
    pub source_counts: Vec<(String, usize)>,
    pub total_fetched: usize,
    pub after_dedup: usize,
    pub valid: usize,
    pub invalid: usize,
    pub drift_warnings: Vec<String>,
    pub raw_paths: Vec<String>,
    pub observations_path: String,
    pub dry_run: bool,
}

pub struct CollectionPipeline<'a> {
    storage: &'a dyn StorageBackend,
    dry_run: bool,
}

impl<'a> CollectionPipeline<'a> {
    pub fn new(storage: &'a dyn StorageBackend, dry_run: bool) -> Self {
        Self { storage, dry_run }
    }

    /// Single-source collection with an optional fixture-style fallback.
    ///
    /// The fallback is tried when the primary fails or returns nothing;
    /// without one, the primary's fetch error propagates and aborts the run.
    pub async fn run_single(
        &self,
        primary: &dyn PriceSource,
        fallback: Option<&dyn PriceSource>,
        date: NaiveDate,
    ) -> Result<CollectionSummary, PipelineError> {
        info!(%date, source = primary.source_id(), tier = primary.source_tier(), "collection run");

        let mut raw_paths = Vec::new();
        let mut source_counts = Vec::new();

        let primary_result = self.fetch_and_archive(primary, date, &mut raw_paths).await;
        let observations = match (primary_result, fallback) {
            (Ok(observations), _) if !observations.is_empty() => {
                source_counts.push((primary.source_id().to_string(), observations.len()));
                observations
            }
            (result, Some(fallback)) => {
                if let Err(e) = &result {
                    warn!(primary = primary.source_id(), error = %e, "primary source failed");
                }
                warn!(fallback = fallback.source_id(), "falling back");
                source_counts.push((primary.source_id().to_string(), 0));
                let observations = self.fetch_and_archive(fallback, date, &mut raw_paths).await?;
                source_counts.push((fallback.source_id().to_string(), observations.len()));
                observations
            }
            (Ok(empty), None) => {
                source_counts.push((primary.source_id().to_string(), empty.len()));
                empty
            }
            (Err(e), None) => return Err(e),
        };

        self.finish(observations, source_counts, DriftReport::default(), date, raw_paths)
    }

    /// Multi-source collection with drift detection and deduplication.
    ///
    /// Sources are fetched independently; one failing source is logged and
    /// skipped, the rest proceed. Results are merged in configured source
    /// order so deduplication ties resolve deterministically.
    pub async fn run_multi(
        &self,
        sources: &[Box<dyn PriceSource>],
        date: NaiveDate,
        drift_threshold: f64,
    ) -> Result<CollectionSummary, PipelineError> {
        info!(
            %date,
            sources = %sources.iter().map(|s| s.source_id()).collect::<Vec<_>>().join(","),
            "multi-source collection run"
        );

        let fetches = futures::future::join_all(
            sources
                .iter()
                .map(|source| async move { source.fetch(date).await }),
        )
        .await;

        let mut merged: Vec<Observation> = Vec::new();
        let mut source_counts = Vec::new();
        let mut raw_paths = Vec::new();

        for (source, result) in sources.iter().zip(fetches) {
            match result {
                Ok(observations) => {
                    info!(source = source.source_id(), count = observations.len(), "fetched");
                    source_counts.push((source.source_id().to_string(), observations.len()));
                    merged.extend(observations);
                    // A raw-archive fetch failure loses that source's audit
                    // file, not the run; storage failures stay fatal.
                    match self.archive_raw(source.as_ref(), date).await {
                        Ok(Some(path)) => raw_paths.push(path),
                        Ok(None) => {}
                        Err(PipelineError::Fetch(e)) => {
                            warn!(source = source.source_id(), error = %e, "raw archive fetch failed, skipping");
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => {
                    error!(source = source.source_id(), error = %e, "source failed, skipping");
                    source_counts.push((source.source_id().to_string(), 0));
                }
            }
        }

        let drift = detect_drift(&merged, drift_threshold);
        for warning in &drift.warnings {
            warn!(drift = %warning, "price drift");
        }

        let total = merged.len();
        let deduped = deduplicate(merged);
        info!(before = total, after = deduped.len(), "deduplicated");

        self.finish(deduped, source_counts, drift, date, raw_paths)
    }

    fn finish(
        &self,
        observations: Vec<Observation>,
        source_counts: Vec<(String, usize)>,
        drift: DriftReport,
        date: NaiveDate,
        raw_paths: Vec<String>,
    ) -> Result<CollectionSummary, PipelineError> {
        let total_fetched: usize = source_counts.iter().map(|(_, n)| n).sum();
        let after_dedup = observations.len();

        let (valid, invalid) = validate_observations(observations);
        info!(valid = valid.len(), invalid, "validated");

        if valid.is_empty() {
            return Err(PipelineError::NoObservations { date });
        }

        let observations_path = self.store_observations(&valid, date)?;

        Ok(CollectionSummary {
            date,
            source_counts,
            total_fetched,
            after_dedup,
            valid: valid.len(),
            invalid,
            drift_warnings: drift.warnings,
            raw_paths,
            observations_path,
            dry_run: self.dry_run,
        })
    }

    async fn fetch_and_archive(
        &self,
        source: &dyn PriceSource,
        date: NaiveDate,
        raw_paths: &mut Vec<String>,
    ) -> Result<Vec<Observation>, PipelineError> {
        let observations = source.fetch(date).await?;
        if let Some(path) = self.archive_raw(source, date).await? {
            raw_paths.push(path);
        }
        Ok(observations)
    }

    /// Store the unmodified upstream payload, one file per source per date.
    async fn archive_raw(
        &self,
        source: &dyn PriceSource,
        date: NaiveDate,
    ) -> Result<Option<String>, PipelineError> {
        let path = storage::raw_path(source.source_id(), date);
        if self.dry_run {
            return Ok(Some(path));
        }

        let mut raw = source.fetch_raw(date).await?;
        if let Some(envelope) = raw.as_object_mut() {
            envelope.insert(
                "_meta".to_string(),
                serde_json::json!({
                    "collected_at": crate::observation::collected_at_now(),
                    "source_id": source.source_id(),
                    "target_date": date,
                }),
            );
        }
        let content = serde_json::to_string_pretty(&raw).map_err(|source| {
            PipelineError::Serialize {
                what: "raw archive",
                source,
            }
        })?;
        self.storage.write(&path, &content)?;
        Ok(Some(path))
    }

    /// Append-only per-date collection: one JSON object per line, whole file
    /// replaced on re-run.
    fn store_observations(
        &self,
        observations: &[Observation],
        date: NaiveDate,
    ) -> Result<String, PipelineError> {
        let path = storage::observations_path(date);
        if self.dry_run {
            return Ok(path);
        }

        let mut lines = String::new();
        for obs in observations {
            let line = serde_json::to_string(obs).map_err(|source| PipelineError::Serialize {
                what: "observation",
                source,
            })?;
            lines.push_str(&line);
            lines.push('\n');
        }
        self.storage.write(&path, &lines)?;
        Ok(path)
    }
}

/// Computes and stores the day's index from previously stored observations.
pub struct IndexingPipeline<'a> {
    storage: &'a dyn StorageBackend,
    indexer: Indexer,
    dry_run: bool,
}

impl<'a> IndexingPipeline<'a> {
    pub fn new(storage: &'a dyn StorageBackend, indexer: Indexer, dry_run: bool) -> Self {
        Self {
            storage,
            indexer,
            dry_run,
        }
    }

    pub fn run(&self, date: NaiveDate) -> Result<(DailyIndexOutput, String), PipelineError> {
        let observations = self.load_observations(date)?;
        if observations.is_empty() {
            return Err(PipelineError::MissingObservations { date });
        }
        info!(%date, count = observations.len(), "computing indices");

        let output = self.indexer.compute(&observations, Some(date))?;

        let path = storage::index_path(date);
        if !self.dry_run {
            let content =
                serde_json::to_string_pretty(&output).map_err(|source| PipelineError::Serialize {
                    what: "index output",
                    source,
                })?;
            self.storage.write(&path, &content)?;
        }

        Ok((output, path))
    }

    fn load_observations(&self, date: NaiveDate) -> Result<Vec<Observation>, PipelineError> {
        let path = storage::observations_path(date);
        let Some(content) = self.storage.read(&path)? else {
            return Err(PipelineError::MissingObservations { date });
        };

        let records: Vec<serde_json::Value> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        let (valid, invalid) = validate_raw(records);
        if invalid > 0 {
            warn!(invalid, "skipped malformed stored observations");
        }
        Ok(valid)
    }
}

/// Read back the most recent stored index, if any.
pub fn load_latest_index(
    storage: &dyn StorageBackend,
) -> Result<Option<DailyIndexOutput>, PipelineError> {
    let Some(path) = storage::latest_dated_file(storage, "indices", ".json")? else {
        return Ok(None);
    };
    let Some(content) = storage.read(&path)? else {
        return Ok(None);
    };
    let output = serde_json::from_str(&content).map_err(|source| PipelineError::Serialize {
        what: "stored index",
        source,
    })?;
    Ok(Some(output))
}
