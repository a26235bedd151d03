//! The Observation record - one source's reported price for one model on one date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current observation schema version.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// How an observation was obtained from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMethod {
    AggregatorApi,
    ConfigFile,
    Manual,
    Fixture,
}

impl CollectionMethod {
    /// Deduplication rank: official config files beat aggregators, which beat
    /// everything else. Lower wins.
    pub fn priority(self) -> u8 {
        match self {
            CollectionMethod::ConfigFile => 0,
            CollectionMethod::AggregatorApi => 1,
            _ => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionMethod::AggregatorApi => "aggregator_api",
            CollectionMethod::ConfigFile => "config_file",
            CollectionMethod::Manual => "manual",
            CollectionMethod::Fixture => "fixture",
        }
    }
}

/// One source's reported price for one model on one date.
///
/// Rates are USD per 1,000,000 tokens. Observations are immutable once
/// created: a re-run for the same date replaces the whole day's file rather
/// than patching individual records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub observation_id: String,
    pub schema_version: String,
    pub provider: String,
    pub model_id: String,
    pub model_display_name: String,
    pub input_rate_usd_per_1m: f64,
    pub output_rate_usd_per_1m: f64,
    pub effective_date: NaiveDate,
    pub collected_at: String,
    pub source_url: String,
    pub source_tier: String,
    pub currency: String,
    pub collection_method: CollectionMethod,
    pub confidence_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_tier: Option<String>,
}

/// Deterministic observation identity for (date, provider, model).
///
/// Re-runs for the same date regenerate the same id, so identity is stable
/// across runs even when the observed rates change.
pub fn observation_id(date: NaiveDate, provider: &str, model_id: &str) -> String {
    format!("obs-{}-{}-{}", date, provider, model_id.replace('/', "-"))
}

/// UTC collection timestamp in the `Z`-suffixed form the wire format uses.
pub fn collected_at_now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}
