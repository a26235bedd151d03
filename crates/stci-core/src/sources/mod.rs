//! Source adapters - each wraps one origin of pricing data behind the same
//! fetch contract.

pub mod direct;
pub mod fixture;
pub mod openrouter;

use crate::error::FetchError;
use crate::observation::Observation;
use async_trait::async_trait;
use chrono::NaiveDate;

pub use direct::ConfigFileSource;
pub use fixture::FixtureSource;
pub use openrouter::OpenRouterSource;

/// A single origin of pricing observations.
///
/// Adapters carry no shared state; the orchestrator constructs and owns the
/// instances it needs and calls them independently. Failure is a typed
/// [`FetchError`] so callers can tell transport problems from missing local
/// configuration - no retry happens inside an adapter.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Stable identifier used for raw-archive paths and run summaries.
    fn source_id(&self) -> &str;

    /// Confidence tier, `T1` highest through `T4` lowest.
    fn source_tier(&self) -> &str;

    /// Fetch all observations this source reports for `date`.
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<Observation>, FetchError>;

    /// The unmodified upstream payload, archived verbatim as the immutable
    /// audit trail. Sources without a real upstream body return a synthetic
    /// envelope.
    async fn fetch_raw(&self, _date: NaiveDate) -> Result<serde_json::Value, FetchError> {
        Ok(serde_json::json!({ "data": [], "source": self.source_id() }))
    }
}
