use std::sync::Arc;

use super::domain::{NutritionRecord, ProductCode, Provenance};
use super::repository::{NutritionRepository, RepositoryError};
use super::sources::SourceAdapter;

/// Outcome of resolving a product code to a nutrition record.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub record: Option<NutritionRecord>,
    pub provenance: Provenance,
}

/// Cache check followed by the provider fallback chain, in priority order.
pub struct Resolver<R> {
    repository: Arc<R>,
    adapters: Vec<SourceAdapter>,
}

impl<R> Resolver<R>
where
    R: NutritionRepository,
{
    pub fn new(repository: Arc<R>, adapters: Vec<SourceAdapter>) -> Self {
        Self {
            repository,
            adapters,
        }
    }

    pub async fn resolve(&self, code: &ProductCode) -> Result<Resolution, RepositoryError> {
        if let Some(record) = self.repository.nutrition_record(code)? {
            tracing::debug!(%code, "nutrition record already known");
            return Ok(Resolution {
                record: Some(record),
                provenance: Provenance::AlreadyKnown,
            });
        }

        for adapter in &self.adapters {
            if let Some(record) = adapter.fetch(code, self.repository.as_ref()).await? {
                // A concurrent request may have stored a record from another source first.
                let provenance = if record.data_source == adapter.data_source() {
                    Provenance::Source(record.data_source)
                } else {
                    Provenance::AlreadyKnown
                };
                return Ok(Resolution {
                    record: Some(record),
                    provenance,
                });
            }
        }

        tracing::info!(%code, "product unresolved by every provider");
        Ok(Resolution {
            record: None,
            provenance: Provenance::Unresolved,
        })
    }
}
