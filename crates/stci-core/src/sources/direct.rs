//! Official per-provider pricing from signed-off config tables.
//!
//! Providers without a public pricing API get a local TOML table of
//! manually verified rates, one observation per priced model.

use super::PriceSource;
use crate::error::FetchError;
use crate::observation::{self, CollectionMethod, Observation};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    input_rate: f64,
    #[serde(default)]
    output_rate: f64,
    context_window: Option<u64>,
    tier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PricingTable {
    provider: String,
    source_url: String,
    // BTreeMap keeps emission order deterministic.
    #[serde(default)]
    models: BTreeMap<String, ModelEntry>,
}

/// One provider's official pricing, read from a local versioned table.
pub struct ConfigFileSource {
    source_id: String,
    config_path: PathBuf,
}

impl ConfigFileSource {
    pub fn new(source_id: &str, config_path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.to_string(),
            config_path: config_path.into(),
        }
    }

    pub fn openai(data_dir: &Path) -> Self {
        Self::new("openai_direct", data_dir.join("fixtures/openai_pricing.toml"))
    }

    pub fn anthropic(data_dir: &Path) -> Self {
        Self::new(
            "anthropic_direct",
            data_dir.join("fixtures/anthropic_pricing.toml"),
        )
    }

    pub fn google(data_dir: &Path) -> Self {
        Self::new("google_direct", data_dir.join("fixtures/google_pricing.toml"))
    }

    fn load_table(&self) -> Result<PricingTable, FetchError> {
        if !self.config_path.exists() {
            return Err(FetchError::MissingConfig {
                source_id: self.source_id.clone(),
                path: self.config_path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(&self.config_path)
            .map_err(|e| FetchError::parse(&self.source_id, e))?;
        toml::from_str(&content).map_err(|e| FetchError::parse(&self.source_id, e))
    }
}

#[async_trait]
impl PriceSource for ConfigFileSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn source_tier(&self) -> &str {
        "T1"
    }

    async fn fetch(&self, date: NaiveDate) -> Result<Vec<Observation>, FetchError> {
        let table = self.load_table()?;
        let collected_at = observation::collected_at_now();

        let mut observations = Vec::with_capacity(table.models.len());
        for (model_id, entry) in table.models {
            // Zero for both rates means "no pricing recorded", not free.
            if entry.input_rate == 0.0 && entry.output_rate == 0.0 {
                continue;
            }

            observations.push(Observation {
                observation_id: observation::observation_id(date, &table.provider, &model_id),
                schema_version: observation::SCHEMA_VERSION.to_string(),
                provider: table.provider.clone(),
                model_id: format!("{}/{}", table.provider, model_id),
                model_display_name: model_id,
                input_rate_usd_per_1m: entry.input_rate,
                output_rate_usd_per_1m: entry.output_rate,
                effective_date: date,
                collected_at: collected_at.clone(),
                source_url: table.source_url.clone(),
                source_tier: self.source_tier().to_string(),
                currency: "USD".to_string(),
                collection_method: CollectionMethod::ConfigFile,
                confidence_level: "high".to_string(),
                context_window: entry.context_window,
                model_tier: entry.tier,
            });
        }

        Ok(observations)
    }
}
