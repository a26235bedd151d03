//! Cross-source price drift detection.
//!
//! Compares same-model prices reported by different sources and surfaces
//! discrepancies beyond a tolerance. Advisory only: nothing is discarded
//! here, deduplication runs independently of drift findings.

use crate::normalize::canonical_model_key;
use crate::observation::Observation;
use std::collections::BTreeMap;

/// Default tolerance: 5% symmetric difference.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.05;

/// One flagged pair: (canonical model key, source A, source B, input diff,
/// output diff). Differences are fractions, not percent.
#[derive(Debug, Clone, PartialEq)]
pub struct Discrepancy {
    pub model_key: String,
    pub source_a: String,
    pub source_b: String,
    pub input_diff: f64,
    pub output_diff: f64,
}

/// Transient result of a drift analysis. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct DriftReport {
    pub discrepancies: Vec<Discrepancy>,
    pub warnings: Vec<String>,
}

impl DriftReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn discrepancy_count(&self) -> usize {
        self.discrepancies.len()
    }
}

/// Compare prices across sources for the same canonical model.
///
/// Every unordered pair within a canonical-key group is checked for both
/// rates independently; exceeding `threshold` on either flags the pair.
pub fn detect_drift(observations: &[Observation], threshold: f64) -> DriftReport {
    let mut report = DriftReport::default();

    // BTreeMap keeps warning order stable across runs.
    let mut groups: BTreeMap<String, Vec<&Observation>> = BTreeMap::new();
    for obs in observations {
        groups
            .entry(canonical_model_key(&obs.model_id))
            .or_default()
            .push(obs);
    }

    for (model_key, group) in &groups {
        if group.len() < 2 {
            continue;
        }

        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                let (a, b) = (group[i], group[j]);

                let input_diff =
                    symmetric_pct_diff(a.input_rate_usd_per_1m, b.input_rate_usd_per_1m);
                let output_diff =
                    symmetric_pct_diff(a.output_rate_usd_per_1m, b.output_rate_usd_per_1m);

                if input_diff > threshold || output_diff > threshold {
                    let src_a = source_label(a);
                    let src_b = source_label(b);

                    let detail = if input_diff > threshold && output_diff > threshold {
                        format!(
                            "input differs by {:.1}%, output differs by {:.1}%",
                            input_diff * 100.0,
                            output_diff * 100.0
                        )
                    } else if input_diff > threshold {
                        format!("input differs by {:.1}%", input_diff * 100.0)
                    } else {
                        format!("output differs by {:.1}%", output_diff * 100.0)
                    };
                    report
                        .warnings
                        .push(format!("{model_key}: {src_a} vs {src_b} - {detail}"));

                    report.discrepancies.push(Discrepancy {
                        model_key: model_key.clone(),
                        source_a: src_a,
                        source_b: src_b,
                        input_diff,
                        output_diff,
                    });
                }
            }
        }
    }

    report
}

/// Symmetric percentage difference `|a-b| / ((a+b)/2)`.
///
/// If exactly one value is zero the difference is defined as 1.0 (100%);
/// if both are zero it is 0.0.
pub fn symmetric_pct_diff(a: f64, b: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        return 0.0;
    }
    if a == 0.0 || b == 0.0 {
        return 1.0;
    }
    (a - b).abs() / ((a + b) / 2.0)
}

/// Readable source name from an observation's URL or collection method.
fn source_label(obs: &Observation) -> String {
    let raw = if obs.source_url.is_empty() {
        obs.collection_method.as_str().to_string()
    } else {
        obs.source_url.clone()
    };
    let lower = raw.to_lowercase();

    for known in ["openrouter", "openai", "anthropic", "google"] {
        if lower.contains(known) {
            return known.to_string();
        }
    }
    if raw == "config_file" {
        return "config".to_string();
    }
    raw.chars().take(20).collect()
}
