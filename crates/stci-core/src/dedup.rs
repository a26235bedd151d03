//! Deduplication of multi-source observations.
//!
//! When several sources report the same canonical model, exactly one
//! observation survives, chosen by collection-method priority: official
//! config files beat the aggregator, which beats everything else. The
//! winner keeps all of its original fields; nothing is merged across
//! sources.

use crate::normalize::canonical_model_key;
use crate::observation::Observation;
use std::collections::BTreeMap;

/// Keep one observation per canonical model key.
///
/// Ties within a priority rank keep the first-encountered observation, so
/// callers must merge source results in a deterministic order (the pipeline
/// appends them in configured source order) to preserve the reproducibility
/// contract.
pub fn deduplicate(observations: Vec<Observation>) -> Vec<Observation> {
    // BTreeMap gives a stable output order across runs.
    let mut groups: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
    for obs in observations {
        groups
            .entry(canonical_model_key(&obs.model_id))
            .or_default()
            .push(obs);
    }

    groups
        .into_values()
        .filter_map(|mut group| {
            group.sort_by_key(|obs| obs.collection_method.priority());
            group.into_iter().next()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::CollectionMethod;
    use chrono::NaiveDate;

    fn obs(model_id: &str, method: CollectionMethod, input: f64) -> Observation {
        Observation {
            observation_id: format!("obs-2026-01-01-test-{}", model_id.replace('/', "-")),
            schema_version: crate::observation::SCHEMA_VERSION.to_string(),
            provider: "test".to_string(),
            model_id: model_id.to_string(),
            model_display_name: model_id.to_string(),
            input_rate_usd_per_1m: input,
            output_rate_usd_per_1m: input * 4.0,
            effective_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            collected_at: "2026-01-01T00:30:00Z".to_string(),
            source_url: String::new(),
            source_tier: "T1".to_string(),
            currency: "USD".to_string(),
            collection_method: method,
            confidence_level: "high".to_string(),
            context_window: None,
            model_tier: None,
        }
    }

    #[test]
    fn test_config_file_wins_regardless_of_input_order() {
        let observations = vec![
            obs("openai/gpt-4o", CollectionMethod::AggregatorApi, 2.4),
            obs("gpt-4o", CollectionMethod::ConfigFile, 2.5),
            obs("gpt-4o-2024-11-20", CollectionMethod::Manual, 2.6),
        ];
        let deduped = deduplicate(observations);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].collection_method, CollectionMethod::ConfigFile);
        assert_eq!(deduped[0].input_rate_usd_per_1m, 2.5);
    }

    #[test]
    fn test_ties_keep_first_encountered() {
        let observations = vec![
            obs("openai/gpt-4o", CollectionMethod::AggregatorApi, 1.0),
            obs("gpt-4o", CollectionMethod::AggregatorApi, 9.0),
        ];
        let deduped = deduplicate(observations);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].input_rate_usd_per_1m, 1.0);
    }

    #[test]
    fn test_distinct_models_all_kept() {
        let observations = vec![
            obs("gpt-3.5-turbo", CollectionMethod::AggregatorApi, 0.5),
            obs("gpt-3.5-turbo-16k", CollectionMethod::AggregatorApi, 3.0),
            obs("claude-3.5-sonnet", CollectionMethod::AggregatorApi, 3.0),
        ];
        assert_eq!(deduplicate(observations).len(), 3);
    }

    #[test]
    fn test_winner_fields_not_merged() {
        let mut official = obs("gpt-4o", CollectionMethod::ConfigFile, 2.5);
        official.context_window = None;
        let mut aggregator = obs("openai/gpt-4o", CollectionMethod::AggregatorApi, 2.4);
        aggregator.context_window = Some(128_000);

        let deduped = deduplicate(vec![aggregator, official]);
        assert_eq!(deduped.len(), 1);
        // The official record wins and its missing context window stays missing.
        assert_eq!(deduped[0].context_window, None);
    }
}
