//! Observation validation.
//!
//! Invalid observations are dropped and counted, never fatal: the pipeline
//! continues with the valid subset. Passing validation does not guarantee a
//! rate is economically sane, only that the record is structurally complete.

use crate::observation::Observation;
use serde_json::Value;
use tracing::warn;

/// Fields every observation must carry on the wire.
pub const REQUIRED_FIELDS: &[&str] = &[
    "observation_id",
    "schema_version",
    "provider",
    "model_id",
    "input_rate_usd_per_1m",
    "output_rate_usd_per_1m",
    "effective_date",
    "collected_at",
    "source_url",
    "source_tier",
    "currency",
    "collection_method",
];

/// Structural validation of typed observations.
///
/// Serde already guarantees field presence and types; what remains is that
/// identity fields are non-empty and rates are finite, non-negative numbers.
pub fn validate_observations(observations: Vec<Observation>) -> (Vec<Observation>, usize) {
    let mut valid = Vec::with_capacity(observations.len());
    let mut invalid = 0;

    for obs in observations {
        if let Some(reason) = structural_problem(&obs) {
            invalid += 1;
            warn!(model_id = %obs.model_id, reason, "dropping invalid observation");
        } else {
            valid.push(obs);
        }
    }

    (valid, invalid)
}

fn structural_problem(obs: &Observation) -> Option<&'static str> {
    if obs.observation_id.is_empty() {
        return Some("empty observation_id");
    }
    if obs.provider.is_empty() {
        return Some("empty provider");
    }
    if obs.model_id.is_empty() {
        return Some("empty model_id");
    }
    if !obs.input_rate_usd_per_1m.is_finite() || obs.input_rate_usd_per_1m < 0.0 {
        return Some("input rate not a finite non-negative number");
    }
    if !obs.output_rate_usd_per_1m.is_finite() || obs.output_rate_usd_per_1m < 0.0 {
        return Some("output rate not a finite non-negative number");
    }
    None
}

/// Validate raw JSON records against the fixed required-field list, then
/// deserialize the survivors. Used when reading stored observation lines,
/// where records may predate the current schema.
pub fn validate_raw(records: Vec<Value>) -> (Vec<Observation>, usize) {
    let mut valid = Vec::with_capacity(records.len());
    let mut invalid = 0;

    for record in records {
        let missing = REQUIRED_FIELDS
            .iter()
            .find(|field| record.get(**field).is_none());
        if let Some(field) = missing {
            invalid += 1;
            warn!(field, "dropping observation missing required field");
            continue;
        }
        match serde_json::from_value::<Observation>(record) {
            Ok(obs) => valid.push(obs),
            Err(err) => {
                invalid += 1;
                warn!(error = %err, "dropping observation that failed schema deserialization");
            }
        }
    }

    (valid, invalid)
}
