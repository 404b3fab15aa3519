//! External nutrition providers.
//!
//! Each provider implements [`NutritionSource`] and returns its raw payload
//! wrapped in [`ProviderPayload`]; normalisation into the canonical
//! [`NutritionRecord`] happens in one place per provider. [`SourceAdapter`]
//! wraps a source so that failures degrade to "not found" and successful
//! lookups are persisted before they are returned.

mod coerce;
pub mod nutritionix;
pub mod open_food_facts;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{DataSource, NutritionRecord, ProductCode};
use super::repository::{NutritionRepository, RepositoryError};

pub use nutritionix::{NutritionixConfig, NutritionixItem, NutritionixSource};
pub use open_food_facts::{OpenFoodFactsConfig, OpenFoodFactsProduct, OpenFoodFactsSource};

/// Raw provider payload, one variant per provider schema.
#[derive(Debug, Clone)]
pub enum ProviderPayload {
    OpenFoodFacts(OpenFoodFactsProduct),
    Nutritionix(NutritionixItem),
}

impl ProviderPayload {
    pub fn data_source(&self) -> DataSource {
        match self {
            ProviderPayload::OpenFoodFacts(_) => DataSource::OpenFoodFacts,
            ProviderPayload::Nutritionix(_) => DataSource::Nutritionix,
        }
    }

    pub fn normalize(self, code: &ProductCode, fetched_at: DateTime<Utc>) -> NutritionRecord {
        match self {
            ProviderPayload::OpenFoodFacts(product) => product.into_record(code, fetched_at),
            ProviderPayload::Nutritionix(item) => item.into_record(code, fetched_at),
        }
    }
}

/// Outbound lookup against one nutrition provider.
#[async_trait]
pub trait NutritionSource: Send + Sync {
    fn data_source(&self) -> DataSource;

    /// `Ok(None)` when the provider reports the product as unknown.
    async fn lookup(&self, code: &ProductCode) -> Result<Option<ProviderPayload>, SourceError>;
}

/// Provider failure. Absorbed by [`SourceAdapter`]; never reaches the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("provider payload could not be decoded: {0}")]
    Decode(String),
    #[error("provider client could not be built: {0}")]
    Client(String),
}

/// Source wrapper enforcing the adapter contract: any provider failure is
/// logged and treated as not found, and a found record is written to the
/// repository (insert-if-absent) before it is handed back.
#[derive(Clone)]
pub struct SourceAdapter {
    source: Arc<dyn NutritionSource>,
}

impl SourceAdapter {
    pub fn new(source: Arc<dyn NutritionSource>) -> Self {
        Self { source }
    }

    pub fn data_source(&self) -> DataSource {
        self.source.data_source()
    }

    pub async fn fetch<R>(
        &self,
        code: &ProductCode,
        repository: &R,
    ) -> Result<Option<NutritionRecord>, RepositoryError>
    where
        R: NutritionRepository + ?Sized,
    {
        let source = self.source.data_source();
        let payload = match self.source.lookup(code).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                tracing::debug!(%code, source = source.label(), "product not found");
                return Ok(None);
            }
            Err(err) => {
                tracing::warn!(%code, source = source.label(), error = %err, "provider unavailable");
                return Ok(None);
            }
        };

        let record = payload.normalize(code, Utc::now());
        let stored = repository.insert_nutrition_record(record)?;
        tracing::info!(%code, source = source.label(), "nutrition record stored");
        Ok(Some(stored))
    }
}

/// Builds a reqwest client with the per-call timeout every provider must honour.
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(concat!("wellscan/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|err| SourceError::Client(err.to_string()))
}
