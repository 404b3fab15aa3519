//! Scan-to-wellness pipeline: score cache, provider fallback, rule evaluation.

pub mod domain;
pub(crate) mod evaluation;
pub mod memory;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod seed;
pub mod service;
pub mod sources;

#[cfg(test)]
mod tests;

pub use domain::{
    CategoryCode, DataSource, FoodCategory, ManualEntry, Nutrient, NutritionFacts,
    NutritionRecord, NutritionRule, NutritionalField, ProductCode, Provenance, RuleDraft, RuleId,
    RuleType, Verdict, WellnessResult, WellnessScore,
};
pub use evaluation::{current_rule, evaluate, main_ingredient, EvaluationContext};
pub use memory::InMemoryNutritionRepository;
pub use repository::{NutritionRepository, RepositoryError, ScanEvent, ScanLog, ScanLogError};
pub use resolver::{Resolution, Resolver};
pub use router::{scan_router, ScanResponse};
pub use seed::{SeedImportError, SeedImporter, SeedSummary};
pub use service::{PipelineError, WellnessPipeline};
pub use sources::{
    NutritionSource, NutritionixConfig, NutritionixSource, OpenFoodFactsConfig,
    OpenFoodFactsSource, ProviderPayload, SourceAdapter, SourceError,
};
