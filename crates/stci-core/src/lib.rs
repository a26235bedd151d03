#![deny(clippy::all)]

//! STCI core - the collection-reconciliation-aggregation pipeline behind the
//! Standard Token Cost Index.
//!
//! Pricing observations flow strictly left to right: fetch -> archive raw ->
//! normalize -> drift-check -> dedupe -> validate -> aggregate -> persist,
//! once per calendar date.

pub mod dedup;
pub mod drift;
pub mod error;
pub mod indexer;
pub mod methodology;
pub mod normalize;
pub mod observation;
pub mod pipeline;
pub mod sources;
pub mod storage;
pub mod validate;

pub use dedup::deduplicate;
pub use drift::{detect_drift, DriftReport, DEFAULT_DRIFT_THRESHOLD};
pub use error::{FetchError, PipelineError, StorageError};
pub use indexer::{DailyIndexOutput, IndexResult, Indexer};
pub use methodology::{IndexDefinition, Methodology};
pub use normalize::canonical_model_key;
pub use observation::{CollectionMethod, Observation};
pub use pipeline::{load_latest_index, CollectionPipeline, CollectionSummary, IndexingPipeline};
pub use sources::{ConfigFileSource, FixtureSource, OpenRouterSource, PriceSource};
pub use storage::{StorageBackend, StorageConfig};
pub use validate::validate_observations;

pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
