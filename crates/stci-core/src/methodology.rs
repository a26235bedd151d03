//! Methodology document - the versioned configuration driving index
//! computation. Read-only to the pipeline.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Definition of one named index. An explicit `models` basket restricts the
/// index to those identifiers; no basket means every valid observation
/// contributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_weighting")]
    pub weighting: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
}

fn default_weighting() -> String {
    "equal".to_string()
}

/// Decimal rounding precision per field class. Only `output` is applied by
/// the indexer today; `rates` and `weights` are carried for the published
/// methodology document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecimalPlaces {
    #[serde(default = "default_rates_decimals")]
    pub rates: u32,
    #[serde(default = "default_weights_decimals")]
    pub weights: u32,
    #[serde(default = "default_output_decimals")]
    pub output: u32,
}

fn default_rates_decimals() -> u32 {
    6
}
fn default_weights_decimals() -> u32 {
    8
}
fn default_output_decimals() -> u32 {
    2
}

impl Default for DecimalPlaces {
    fn default() -> Self {
        Self {
            rates: default_rates_decimals(),
            weights: default_weights_decimals(),
            output: default_output_decimals(),
        }
    }
}

/// The versioned index methodology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Methodology {
    #[serde(default = "default_version")]
    pub methodology_version: String,
    /// Weight applied to output tokens when blending: output tokens are
    /// treated as N times as expensive-weighted as input tokens. Asserted by
    /// configuration, not derived from usage data.
    #[serde(default = "default_output_ratio")]
    pub output_ratio: f64,
    /// Fraction of an explicit basket that must be present for that index to
    /// be emitted. Each index is gated independently.
    #[serde(default = "default_min_basket_coverage")]
    pub min_basket_coverage: f64,
    #[serde(default)]
    pub decimal_places: DecimalPlaces,
    #[serde(default)]
    pub indices: BTreeMap<String, IndexDefinition>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}
fn default_output_ratio() -> f64 {
    3.0
}
fn default_min_basket_coverage() -> f64 {
    0.5
}

impl Default for Methodology {
    fn default() -> Self {
        let mut indices = BTreeMap::new();
        indices.insert(
            "STCI-ALL".to_string(),
            IndexDefinition {
                description: Some("All eligible models, equally weighted".to_string()),
                weighting: default_weighting(),
                models: None,
            },
        );
        Self {
            methodology_version: default_version(),
            output_ratio: default_output_ratio(),
            min_basket_coverage: default_min_basket_coverage(),
            decimal_places: DecimalPlaces::default(),
            indices,
        }
    }
}

impl Methodology {
    /// Load a methodology document from JSON or TOML, chosen by extension.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Methodology {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, PipelineError> {
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            toml::from_str(content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| PipelineError::Methodology {
            path: path.display().to_string(),
            message,
        })
    }
}
