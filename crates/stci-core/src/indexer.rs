//! Index computation - turns a validated, deduplicated observation set and a
//! methodology document into the day's named index values plus a
//! deterministic verification hash.

use crate::error::PipelineError;
use crate::methodology::{IndexDefinition, Methodology};
use crate::observation::Observation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One named index's computed values for one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResult {
    pub input_rate: f64,
    pub output_rate: f64,
    pub blended_rate: f64,
    pub model_count: usize,
    pub models_included: Vec<String>,
    /// Sample standard deviation of input rates. Absent, not null, when
    /// fewer than two observations contribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispersion: Option<f64>,
}

/// The aggregation's top-level output for one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyIndexOutput {
    pub date: NaiveDate,
    pub indices: BTreeMap<String, IndexResult>,
    pub methodology_version: String,
    pub computed_at: String,
    pub verification_hash: String,
    pub observation_count: usize,
}

/// Computes STCI values under a fixed methodology.
pub struct Indexer {
    methodology: Methodology,
}

impl Indexer {
    pub fn new(methodology: Methodology) -> Self {
        Self { methodology }
    }

    pub fn methodology(&self) -> &Methodology {
        &self.methodology
    }

    /// Compute every named index independently. An index that cannot be
    /// computed (empty basket, coverage below the floor) is simply absent
    /// from the output; the others still compute.
    pub fn compute(
        &self,
        observations: &[Observation],
        target_date: Option<NaiveDate>,
    ) -> Result<DailyIndexOutput, PipelineError> {
        let date = target_date.unwrap_or_else(|| infer_date(observations));

        let mut indices = BTreeMap::new();
        for (name, definition) in &self.methodology.indices {
            match self.compute_single(observations, definition) {
                Some(result) => {
                    info!(
                        index = %name,
                        blended = result.blended_rate,
                        models = result.model_count,
                        "computed index"
                    );
                    indices.insert(name.clone(), result);
                }
                None => {
                    debug!(index = %name, "index not emitted: empty basket or coverage below floor");
                }
            }
        }

        Ok(DailyIndexOutput {
            date,
            indices,
            methodology_version: self.methodology.methodology_version.clone(),
            computed_at: crate::observation::collected_at_now(),
            verification_hash: self.verification_hash(observations, date)?,
            observation_count: observations.len(),
        })
    }

    fn compute_single(
        &self,
        observations: &[Observation],
        definition: &IndexDefinition,
    ) -> Option<IndexResult> {
        let filtered: Vec<&Observation> = match &definition.models {
            Some(basket) => observations
                .iter()
                .filter(|obs| {
                    basket.contains(&obs.model_id)
                        || basket.contains(&format!("{}/{}", obs.provider, obs.model_id))
                })
                .collect(),
            None => observations.iter().collect(),
        };

        if filtered.is_empty() {
            return None;
        }

        if let Some(basket) = &definition.models {
            let coverage = filtered.len() as f64 / basket.len() as f64;
            if coverage < self.methodology.min_basket_coverage {
                return None;
            }
        }

        let input_rates: Vec<f64> = filtered.iter().map(|o| o.input_rate_usd_per_1m).collect();
        let output_rates: Vec<f64> = filtered.iter().map(|o| o.output_rate_usd_per_1m).collect();

        // Equal weighting across models in this version.
        let avg_input = mean(&input_rates);
        let avg_output = mean(&output_rates);

        // A conversation consuming roughly output_ratio output tokens per
        // input token.
        let ratio = self.methodology.output_ratio;
        let blended = (avg_input + ratio * avg_output) / (1.0 + ratio);

        let dispersion = sample_stddev(&input_rates);

        // Round only here, never at intermediate steps.
        let decimals = self.methodology.decimal_places.output;
        Some(IndexResult {
            input_rate: round_to(avg_input, decimals),
            output_rate: round_to(avg_output, decimals),
            blended_rate: round_to(blended, decimals),
            model_count: filtered.len(),
            models_included: filtered
                .iter()
                .map(|o| {
                    if o.model_id.is_empty() {
                        format!("{}/unknown", o.provider)
                    } else {
                        o.model_id.clone()
                    }
                })
                .collect(),
            dispersion: dispersion.map(|d| round_to(d, decimals)),
        })
    }

    /// First 16 hex characters of SHA-256 over the canonical key-sorted JSON
    /// of {date, methodology version, observations sorted by id}. Re-running
    /// on byte-identical inputs must yield a byte-identical hash.
    fn verification_hash(
        &self,
        observations: &[Observation],
        date: NaiveDate,
    ) -> Result<String, PipelineError> {
        let mut sorted: Vec<&Observation> = observations.iter().collect();
        sorted.sort_by(|a, b| a.observation_id.cmp(&b.observation_id));

        // serde_json's default map is key-sorted, which makes Value
        // serialization canonical.
        let hash_input = serde_json::json!({
            "date": date,
            "methodology_version": self.methodology.methodology_version,
            "observations": sorted,
        });
        let canonical =
            serde_json::to_string(&hash_input).map_err(|source| PipelineError::Serialize {
                what: "verification hash input",
                source,
            })?;

        let digest = Sha256::digest(canonical.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Ok(hex[..16].to_string())
    }
}

fn infer_date(observations: &[Observation]) -> NaiveDate {
    observations
        .first()
        .map(|obs| obs.effective_date)
        .unwrap_or_else(|| chrono::Utc::now().date_naive())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; `None` for fewer than two values.
fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::CollectionMethod;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    fn obs(provider: &str, model_id: &str, input: f64, output: f64) -> Observation {
        Observation {
            observation_id: crate::observation::observation_id(date(), provider, model_id),
            schema_version: crate::observation::SCHEMA_VERSION.to_string(),
            provider: provider.to_string(),
            model_id: model_id.to_string(),
            model_display_name: model_id.to_string(),
            input_rate_usd_per_1m: input,
            output_rate_usd_per_1m: output,
            effective_date: date(),
            collected_at: "2026-01-01T00:30:00Z".to_string(),
            source_url: "https://openrouter.ai/api/v1/models".to_string(),
            source_tier: "T1".to_string(),
            currency: "USD".to_string(),
            collection_method: CollectionMethod::AggregatorApi,
            confidence_level: "high".to_string(),
            context_window: None,
            model_tier: None,
        }
    }

    fn canned() -> Vec<Observation> {
        vec![
            obs("openai", "openai/gpt-4o", 2.50, 10.00),
            obs("anthropic", "anthropic/claude-3.5-sonnet", 3.00, 15.00),
            obs("openai", "openai/gpt-4o-mini", 0.15, 0.60),
        ]
    }

    #[test]
    fn test_two_model_arithmetic() {
        let observations = vec![obs("a", "a/one", 1.0, 4.0), obs("b", "b/two", 3.0, 12.0)];
        let indexer = Indexer::new(Methodology::default());
        let output = indexer.compute(&observations, Some(date())).unwrap();

        let all = &output.indices["STCI-ALL"];
        assert_eq!(all.input_rate, 2.0);
        assert_eq!(all.output_rate, 8.0);
        // (2.0 + 3 * 8.0) / 4
        assert_eq!(all.blended_rate, 6.5);
        assert_eq!(all.model_count, 2);
        assert!(all.dispersion.unwrap() > 0.0);
    }

    #[test]
    fn test_canned_observations_end_to_end() {
        let indexer = Indexer::new(Methodology::default());
        let output = indexer.compute(&canned(), Some(date())).unwrap();

        let all = &output.indices["STCI-ALL"];
        assert_eq!(all.input_rate, 1.88);
        assert_eq!(all.output_rate, 8.53);
        assert_eq!(all.blended_rate, 6.87);
        assert_eq!(all.model_count, 3);
        assert_eq!(all.models_included.len(), 3);
        assert_eq!(output.observation_count, 3);
    }

    #[test]
    fn test_single_observation_has_no_dispersion() {
        let indexer = Indexer::new(Methodology::default());
        let output = indexer
            .compute(&[obs("openai", "openai/gpt-4o", 2.5, 10.0)], Some(date()))
            .unwrap();
        let all = &output.indices["STCI-ALL"];
        assert!(all.dispersion.is_none());

        // Absent from the serialized form too, not null.
        let json = serde_json::to_value(all).unwrap();
        assert!(json.get("dispersion").is_none());
    }

    #[test]
    fn test_basket_filter_matches_prefixed_and_bare_ids() {
        let mut methodology = Methodology::default();
        methodology.indices.insert(
            "STCI-PAIR".to_string(),
            IndexDefinition {
                models: Some(vec![
                    "openai/gpt-4o".to_string(),
                    "anthropic/claude-3.5-sonnet".to_string(),
                ]),
                ..Default::default()
            },
        );
        let indexer = Indexer::new(methodology);
        let output = indexer.compute(&canned(), Some(date())).unwrap();

        let pair = &output.indices["STCI-PAIR"];
        assert_eq!(pair.model_count, 2);
        assert_eq!(pair.input_rate, 2.75);
        assert_eq!(pair.output_rate, 12.5);
    }

    #[test]
    fn test_low_coverage_index_absent_but_all_index_computes() {
        let mut methodology = Methodology {
            min_basket_coverage: 0.5,
            ..Default::default()
        };
        methodology.indices.insert(
            "STCI-MISSING".to_string(),
            IndexDefinition {
                models: Some(vec![
                    "openai/gpt-4o".to_string(),
                    "vendor/absent-model-a".to_string(),
                    "vendor/absent-model-b".to_string(),
                ]),
                ..Default::default()
            },
        );
        let indexer = Indexer::new(methodology);
        let output = indexer.compute(&canned(), Some(date())).unwrap();

        // 1 of 3 basket members present: below the 0.5 floor.
        assert!(!output.indices.contains_key("STCI-MISSING"));
        assert!(output.indices.contains_key("STCI-ALL"));
    }

    #[test]
    fn test_verification_hash_deterministic_and_sensitive() {
        let indexer = Indexer::new(Methodology::default());
        let first = indexer.compute(&canned(), Some(date())).unwrap();
        let second = indexer.compute(&canned(), Some(date())).unwrap();
        assert_eq!(first.verification_hash, second.verification_hash);
        assert_eq!(first.verification_hash.len(), 16);

        let mut changed = canned();
        changed[0].input_rate_usd_per_1m += 0.01;
        let third = indexer.compute(&changed, Some(date())).unwrap();
        assert_ne!(first.verification_hash, third.verification_hash);
    }

    #[test]
    fn test_hash_ignores_observation_order() {
        let indexer = Indexer::new(Methodology::default());
        let forward = indexer.compute(&canned(), Some(date())).unwrap();
        let mut reversed = canned();
        reversed.reverse();
        let backward = indexer.compute(&reversed, Some(date())).unwrap();
        assert_eq!(forward.verification_hash, backward.verification_hash);
    }

    #[test]
    fn test_date_inferred_from_observations() {
        let indexer = Indexer::new(Methodology::default());
        let output = indexer.compute(&canned(), None).unwrap();
        assert_eq!(output.date, date());
    }

    #[test]
    fn test_methodology_version_change_changes_hash() {
        let first = Indexer::new(Methodology::default())
            .compute(&canned(), Some(date()))
            .unwrap();
        let m = Methodology {
            methodology_version: "2.0.0".to_string(),
            ..Default::default()
        };
        let second = Indexer::new(m).compute(&canned(), Some(date())).unwrap();
        assert_ne!(first.verification_hash, second.verification_hash);
    }
}
