use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    CategoryCode, DataSource, FoodCategory, ManualEntry, NutritionRecord, NutritionRule,
    ProductCode, Provenance, WellnessResult, WellnessScore,
};
use super::evaluation::{evaluate, EvaluationContext};
use super::repository::{NutritionRepository, RepositoryError};
use super::resolver::Resolver;
use super::sources::{NutritionSource, SourceAdapter};

/// Pipeline composing the score cache, resolver and rule engine.
pub struct WellnessPipeline<R> {
    repository: Arc<R>,
    resolver: Resolver<R>,
}

impl<R> WellnessPipeline<R>
where
    R: NutritionRepository + 'static,
{
    /// `sources` are consulted in the order given.
    pub fn new(repository: Arc<R>, sources: Vec<Arc<dyn NutritionSource>>) -> Self {
        let adapters = sources.into_iter().map(SourceAdapter::new).collect();
        let resolver = Resolver::new(repository.clone(), adapters);
        Self {
            repository,
            resolver,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Resolve a scanned code to a wellness verdict for the given category.
    pub async fn evaluate(
        &self,
        code: &ProductCode,
        category: &CategoryCode,
    ) -> Result<WellnessResult, PipelineError> {
        let rule = self.current_rule(category)?;

        if let Some(result) = self.cached_result(code, &rule)? {
            tracing::info!(%code, %category, verdict = ?result.verdict, "wellness score cache hit");
            return Ok(result);
        }

        let resolution = self.resolver.resolve(code).await?;
        let Some(record) = resolution.record else {
            return Err(PipelineError::DataUnresolved { code: code.clone() });
        };

        self.score(record, category, &rule, resolution.provenance)
    }

    /// Store caller-supplied details for an unresolved product and score them.
    /// An existing record for the code is kept as-is and reported as
    /// already known.
    pub async fn submit_manual(
        &self,
        code: &ProductCode,
        category: &CategoryCode,
        entry: ManualEntry,
    ) -> Result<WellnessResult, PipelineError> {
        let rule = self.current_rule(category)?;

        if let Some(result) = self.cached_result(code, &rule)? {
            return Ok(result);
        }

        let submitted = entry.into_record(code.clone(), Utc::now());
        let stored = self
            .repository
            .insert_nutrition_record(submitted.clone())?;
        let provenance = if stored == submitted {
            Provenance::Source(DataSource::Manual)
        } else {
            tracing::info!(%code, source = stored.data_source.label(), "manual entry ignored");
            Provenance::AlreadyKnown
        };
        self.score(stored, category, &rule, provenance)
    }

    pub fn record(&self, code: &ProductCode) -> Result<NutritionRecord, PipelineError> {
        self.repository
            .nutrition_record(code)?
            .ok_or_else(|| PipelineError::DataUnresolved { code: code.clone() })
    }

    pub fn categories(&self) -> Result<Vec<FoodCategory>, PipelineError> {
        Ok(self.repository.categories()?)
    }

    fn current_rule(&self, category: &CategoryCode) -> Result<NutritionRule, PipelineError> {
        if self.repository.category(category)?.is_none() {
            return Err(PipelineError::CategoryNotFound(category.clone()));
        }
        self.repository
            .rule_for_category(category)?
            .ok_or_else(|| PipelineError::RuleNotFound(category.clone()))
    }

    fn cached_result(
        &self,
        code: &ProductCode,
        rule: &NutritionRule,
    ) -> Result<Option<WellnessResult>, PipelineError> {
        let Some(score) = self.repository.score(code, rule.id)? else {
            return Ok(None);
        };
        let Some(record) = self.repository.nutrition_record(code)? else {
            return Ok(None);
        };

        Ok(Some(WellnessResult {
            record,
            rule_id: rule.id,
            verdict: score.verdict,
            provenance: Provenance::ScoreCached,
        }))
    }

    fn score(
        &self,
        record: NutritionRecord,
        category: &CategoryCode,
        rule: &NutritionRule,
        provenance: Provenance,
    ) -> Result<WellnessResult, PipelineError> {
        let verdict = evaluate(
            EvaluationContext {
                record: &record,
                category,
            },
            rule,
        );

        self.repository.insert_score(WellnessScore {
            code: record.code.clone(),
            rule_id: rule.id,
            verdict,
            created_at: Utc::now(),
        })?;

        tracing::info!(
            code = %record.code,
            %category,
            rule_id = rule.id.0,
            ?verdict,
            provenance = provenance.label(),
            "wellness score recorded"
        );

        Ok(WellnessResult {
            record,
            rule_id: rule.id,
            verdict,
            provenance,
        })
    }
}

/// Error raised by the wellness pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no nutrition data available for product {code}")]
    DataUnresolved { code: ProductCode },
    #[error("food category {0} is not configured")]
    CategoryNotFound(CategoryCode),
    #[error("no nutrition rule configured for food category {0}")]
    RuleNotFound(CategoryCode),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
