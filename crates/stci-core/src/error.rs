//! Error taxonomy for the collection and indexing pipelines.

use chrono::NaiveDate;
use thiserror::Error;

/// A source adapter could not obtain data.
///
/// The orchestrator distinguishes transport failures from missing local
/// configuration when deciding whether a fallback source is worth trying.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{source_id}: network error: {message}")]
    Network { source_id: String, message: String },

    #[error("{source_id}: unexpected response: {message}")]
    Response { source_id: String, message: String },

    #[error("{source_id}: missing configuration file: {path}")]
    MissingConfig { source_id: String, path: String },

    #[error("{source_id}: failed to parse source data: {message}")]
    Parse { source_id: String, message: String },
}

impl FetchError {
    pub fn network(source_id: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Network {
            source_id: source_id.to_string(),
            message: err.to_string(),
        }
    }

    pub fn parse(source_id: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Parse {
            source_id: source_id.to_string(),
            message: err.to_string(),
        }
    }
}

/// Storage backend failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Fatal pipeline failures. Non-fatal conditions (an invalid observation, a
/// basket below coverage) are counted or logged, never raised.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// After primary and fallback sources, zero usable observations remain.
    /// An empty day is a hard failure, never "zero is a valid answer".
    #[error("collection failed for {date}: no usable observations")]
    NoObservations { date: NaiveDate },

    #[error("no stored observations found for {date}")]
    MissingObservations { date: NaiveDate },

    #[error("failed to load methodology from {path}: {message}")]
    Methodology { path: String, message: String },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_fetch_error_names_the_source() {
        let err = FetchError::network("openrouter", "connection refused");
        assert_eq!(err.to_string(), "openrouter: network error: connection refused");

        let err = FetchError::MissingConfig {
            source_id: "openai_direct".to_string(),
            path: "/data/fixtures/openai_pricing.toml".to_string(),
        };
        assert!(err.to_string().starts_with("openai_direct:"));
    }

    #[test]
    fn test_fetch_error_source_id_is_payload_not_cause() {
        // The source id is plain data; fetch errors carry no underlying cause.
        let err = FetchError::parse("fixture", "expected value at line 1");
        assert!(err.source().is_none());
    }
}
