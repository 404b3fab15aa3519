use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    CategoryCode, FoodCategory, NutritionRecord, NutritionRule, ProductCode, RuleDraft, RuleId,
    WellnessScore,
};
use super::evaluation::current_rule;

/// Storage abstraction so the pipeline can be exercised in isolation.
pub trait NutritionRepository: Send + Sync {
    fn nutrition_record(&self, code: &ProductCode)
        -> Result<Option<NutritionRecord>, RepositoryError>;

    /// Insert-if-absent. When a record already exists for the code the stored
    /// record is returned untouched and the argument is discarded.
    fn insert_nutrition_record(
        &self,
        record: NutritionRecord,
    ) -> Result<NutritionRecord, RepositoryError>;

    fn category(&self, code: &CategoryCode) -> Result<Option<FoodCategory>, RepositoryError>;
    fn categories(&self) -> Result<Vec<FoodCategory>, RepositoryError>;
    fn insert_category(&self, category: FoodCategory) -> Result<FoodCategory, RepositoryError>;

    fn rules_for_category(
        &self,
        category: &CategoryCode,
    ) -> Result<Vec<NutritionRule>, RepositoryError>;
    fn insert_rule(&self, draft: RuleDraft) -> Result<NutritionRule, RepositoryError>;

    /// The rule currently in force for a category.
    fn rule_for_category(
        &self,
        category: &CategoryCode,
    ) -> Result<Option<NutritionRule>, RepositoryError> {
        let rules = self.rules_for_category(category)?;
        Ok(current_rule(&rules).cloned())
    }

    /// Most recent score recorded for the product under the given rule.
    fn score(
        &self,
        code: &ProductCode,
        rule_id: RuleId,
    ) -> Result<Option<WellnessScore>, RepositoryError>;
    fn insert_score(&self, score: WellnessScore) -> Result<WellnessScore, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Trait describing the scan audit trail kept by the HTTP layer.
pub trait ScanLog: Send + Sync {
    fn record(&self, event: ScanEvent) -> Result<(), ScanLogError>;
}

/// One scan request as seen by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub code: ProductCode,
    pub category: CategoryCode,
    pub status: String,
    pub recorded_at: DateTime<Utc>,
}

/// Scan log dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum ScanLogError {
    #[error("scan log unavailable: {0}")]
    Unavailable(String),
}
