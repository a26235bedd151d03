//! OpenRouter aggregator source.
//!
//! One request against the public models catalog; per-token prompt and
//! completion rates are converted to the canonical USD-per-1M-token unit.

use super::PriceSource;
use crate::error::FetchError;
use crate::observation::{self, CollectionMethod, Observation};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SOURCE_ID: &str = "openrouter";

#[derive(Deserialize)]
struct CatalogPricing {
    prompt: Option<String>,
    completion: Option<String>,
}

#[derive(Deserialize)]
struct CatalogModel {
    #[serde(default)]
    id: String,
    name: Option<String>,
    pricing: Option<CatalogPricing>,
    context_length: Option<u64>,
}

#[derive(Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    data: Vec<CatalogModel>,
}

pub struct OpenRouterSource {
    api_url: String,
    client: reqwest::Client,
}

impl Default for OpenRouterSource {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl OpenRouterSource {
    pub fn new(api_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            api_url: api_url.to_string(),
            client,
        }
    }

    async fn get_catalog(&self) -> Result<serde_json::Value, FetchError> {
        let response = self
            .client
            .get(&self.api_url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::network(SOURCE_ID, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Response {
                source_id: SOURCE_ID.to_string(),
                message: format!("HTTP {status}"),
            });
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::parse(SOURCE_ID, e))
    }

    /// Convert a raw catalog payload into observations for `date`.
    ///
    /// Entries missing either rate, or priced at exactly zero for both, are
    /// skipped: zero-zero means "no pricing available", not "free".
    fn normalize(&self, raw: serde_json::Value, date: NaiveDate) -> Result<Vec<Observation>, FetchError> {
        let catalog: CatalogResponse =
            serde_json::from_value(raw).map_err(|e| FetchError::parse(SOURCE_ID, e))?;

        let collected_at = observation::collected_at_now();
        let mut observations = Vec::with_capacity(catalog.data.len());

        for model in catalog.data {
            let Some(pricing) = model.pricing else {
                continue;
            };
            let (Some(prompt), Some(completion)) = (pricing.prompt, pricing.completion) else {
                continue;
            };
            let (Ok(prompt), Ok(completion)) =
                (prompt.trim().parse::<f64>(), completion.trim().parse::<f64>())
            else {
                debug!(model = %model.id, "skipping entry with unparseable pricing");
                continue;
            };

            // $/token -> $/1M tokens.
            let input_rate = prompt * 1_000_000.0;
            let output_rate = completion * 1_000_000.0;
            if input_rate == 0.0 && output_rate == 0.0 {
                continue;
            }

            let provider = if model.id.contains('/') {
                model.id.split('/').next().unwrap_or("unknown").to_string()
            } else {
                "unknown".to_string()
            };

            observations.push(Observation {
                observation_id: observation::observation_id(date, &provider, &model.id),
                schema_version: observation::SCHEMA_VERSION.to_string(),
                provider,
                model_display_name: model.name.unwrap_or_else(|| model.id.clone()),
                model_id: model.id,
                input_rate_usd_per_1m: round6(input_rate),
                output_rate_usd_per_1m: round6(output_rate),
                effective_date: date,
                collected_at: collected_at.clone(),
                source_url: self.api_url.clone(),
                source_tier: self.source_tier().to_string(),
                currency: "USD".to_string(),
                collection_method: CollectionMethod::AggregatorApi,
                confidence_level: "high".to_string(),
                context_window: model.context_length,
                model_tier: None,
            });
        }

        Ok(observations)
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[async_trait]
impl PriceSource for OpenRouterSource {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn source_tier(&self) -> &str {
        "T1"
    }

    async fn fetch(&self, date: NaiveDate) -> Result<Vec<Observation>, FetchError> {
        let raw = self.get_catalog().await?;
        self.normalize(raw, date)
    }

    async fn fetch_raw(&self, _date: NaiveDate) -> Result<serde_json::Value, FetchError> {
        self.get_catalog().await
    }
}
