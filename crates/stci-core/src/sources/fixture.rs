//! Fixture source - static observations for testing and for waterfall
//! fallback when the live aggregator is unavailable.

use super::PriceSource;
use crate::error::FetchError;
use crate::observation::{self, Observation};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub struct FixtureSource {
    fixture_path: PathBuf,
}

impl FixtureSource {
    pub fn new(fixture_path: impl Into<PathBuf>) -> Self {
        Self {
            fixture_path: fixture_path.into(),
        }
    }

    pub fn default_for(data_dir: &Path) -> Self {
        Self::new(data_dir.join("fixtures/observations.sample.json"))
    }

    fn load(&self) -> Result<Vec<Observation>, FetchError> {
        if !self.fixture_path.exists() {
            return Err(FetchError::MissingConfig {
                source_id: self.source_id().to_string(),
                path: self.fixture_path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(&self.fixture_path)
            .map_err(|e| FetchError::parse(self.source_id(), e))?;
        serde_json::from_str(&content).map_err(|e| FetchError::parse(self.source_id(), e))
    }
}

#[async_trait]
impl PriceSource for FixtureSource {
    fn source_id(&self) -> &str {
        "fixture"
    }

    fn source_tier(&self) -> &str {
        "T4"
    }

    /// Load the fixture set, rewriting `effective_date` and `collected_at`
    /// to the requested date and regenerating ids to match. All other fields
    /// are preserved.
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<Observation>, FetchError> {
        let mut observations = self.load()?;
        let collected_at = observation::collected_at_now();

        for obs in &mut observations {
            obs.effective_date = date;
            obs.collected_at = collected_at.clone();
            obs.observation_id = observation::observation_id(date, &obs.provider, &obs.model_id);
        }

        Ok(observations)
    }

    async fn fetch_raw(&self, _date: NaiveDate) -> Result<serde_json::Value, FetchError> {
        let observations = self.load()?;
        Ok(serde_json::json!({ "data": observations, "source": "fixture" }))
    }
}
