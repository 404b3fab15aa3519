use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::scan::domain::{
    CategoryCode, DataSource, FoodCategory, NutritionFacts, NutritionRecord, NutritionRule,
    NutritionalField, ProductCode, RuleDraft, RuleId, RuleType, WellnessScore,
};
use crate::scan::repository::{
    NutritionRepository, RepositoryError, ScanEvent, ScanLog, ScanLogError,
};
use crate::scan::sources::{
    NutritionSource, NutritionixItem, OpenFoodFactsProduct, ProviderPayload, SourceError,
};
use crate::scan::{InMemoryNutritionRepository, WellnessPipeline};

pub(super) const UNKNOWN_CODE: &str = "000000000001";
pub(super) const SNACKS: &str = "27";

pub(super) fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn code() -> ProductCode {
    ProductCode(UNKNOWN_CODE.to_string())
}

pub(super) fn snacks() -> CategoryCode {
    CategoryCode(SNACKS.to_string())
}

pub(super) fn category(code: &str) -> FoodCategory {
    FoodCategory {
        code: CategoryCode(code.to_string()),
        abbr: Some("SNK".to_string()),
        name: Some("Snacks".to_string()),
        description: None,
        notes: None,
    }
}

pub(super) fn draft(
    field: NutritionalField,
    rule_type: RuleType,
    value: &str,
    wellness: bool,
) -> RuleDraft {
    RuleDraft {
        category: snacks(),
        nutrient: None,
        field,
        rule_type,
        value: value.to_string(),
        wellness,
        created_at: at(8),
    }
}

pub(super) fn rule(
    field: NutritionalField,
    rule_type: RuleType,
    value: &str,
    wellness: bool,
) -> NutritionRule {
    draft(field, rule_type, value, wellness).into_rule(RuleId(1))
}

pub(super) fn sodium_rule() -> RuleDraft {
    draft(
        NutritionalField::Sodium,
        RuleType::LessThanOrEqual,
        "200",
        true,
    )
}

pub(super) fn record(ingredients: Option<&str>, sodium: Option<f64>) -> NutritionRecord {
    NutritionRecord {
        code: code(),
        item_name: Some("Salted Crackers".to_string()),
        brand_id: None,
        brand_name: Some("Pantry Co".to_string()),
        item_image: None,
        item_description: None,
        ingredients: ingredients.map(str::to_string),
        nutrients: NutritionFacts {
            sodium,
            sugars: Some(4.0),
            ..NutritionFacts::default()
        },
        data_source: DataSource::Seed,
        source_updated_at: None,
        last_updated: at(9),
    }
}

/// Repository seeded with the snacks category and the given rule.
pub(super) fn repository_with(rule: RuleDraft) -> Arc<InMemoryNutritionRepository> {
    let repository = Arc::new(InMemoryNutritionRepository::default());
    repository
        .insert_category(category(SNACKS))
        .expect("category inserted");
    repository.insert_rule(rule).expect("rule inserted");
    repository
}

pub(super) fn off_payload(sodium: &str) -> ProviderPayload {
    let product: OpenFoodFactsProduct = serde_json::from_value(json!({
        "product_name": "Salted Crackers",
        "brands": "Pantry Co",
        "ingredients_text": "wheat flour, salt, yeast",
        "nutriments": { "sodium": sodium, "sugars": 2 }
    }))
    .expect("valid product");
    ProviderPayload::OpenFoodFacts(product)
}

pub(super) fn nutritionix_payload(sodium: f64) -> ProviderPayload {
    let raw = json!({
        "item_name": "Crackers, Salted",
        "brand_name": "Pantry Co",
        "nf_ingredient_statement": "Enriched flour, oil, salt",
        "nf_sodium": sodium,
        "nf_serving_size_unit": "crackers"
    });
    let Value::Object(map) = raw else {
        unreachable!("object literal")
    };
    ProviderPayload::Nutritionix(NutritionixItem::from_raw(map).expect("valid item"))
}

#[derive(Clone)]
pub(super) enum Reply {
    Found(ProviderPayload),
    NotFound,
    Fail,
}

/// Provider double that counts every lookup it receives.
pub(super) struct FakeSource {
    source: DataSource,
    reply: Reply,
    calls: AtomicUsize,
}

impl FakeSource {
    pub(super) fn new(source: DataSource, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            source,
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NutritionSource for FakeSource {
    fn data_source(&self) -> DataSource {
        self.source
    }

    async fn lookup(&self, _code: &ProductCode) -> Result<Option<ProviderPayload>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Found(payload) => Ok(Some(payload.clone())),
            Reply::NotFound => Ok(None),
            Reply::Fail => Err(SourceError::Status(503)),
        }
    }
}

pub(super) fn pipeline(
    repository: Arc<InMemoryNutritionRepository>,
    sources: &[Arc<FakeSource>],
) -> WellnessPipeline<InMemoryNutritionRepository> {
    let sources = sources
        .iter()
        .map(|source| source.clone() as Arc<dyn NutritionSource>)
        .collect();
    WellnessPipeline::new(repository, sources)
}

#[derive(Default)]
pub(super) struct MemoryScans {
    events: Mutex<Vec<ScanEvent>>,
}

impl MemoryScans {
    pub(super) fn events(&self) -> Vec<ScanEvent> {
        self.events.lock().expect("scan log mutex poisoned").clone()
    }
}

impl ScanLog for MemoryScans {
    fn record(&self, event: ScanEvent) -> Result<(), ScanLogError> {
        self.events
            .lock()
            .expect("scan log mutex poisoned")
            .push(event);
        Ok(())
    }
}

/// Store that is reachable for category and rule reads but fails on scores.
pub(super) struct BrokenScoreStore {
    inner: InMemoryNutritionRepository,
}

impl BrokenScoreStore {
    pub(super) fn new() -> Self {
        let inner = InMemoryNutritionRepository::default();
        inner
            .insert_category(category(SNACKS))
            .expect("category inserted");
        inner.insert_rule(sodium_rule()).expect("rule inserted");
        Self { inner }
    }
}

impl NutritionRepository for BrokenScoreStore {
    fn nutrition_record(
        &self,
        code: &ProductCode,
    ) -> Result<Option<NutritionRecord>, RepositoryError> {
        self.inner.nutrition_record(code)
    }

    fn insert_nutrition_record(
        &self,
        record: NutritionRecord,
    ) -> Result<NutritionRecord, RepositoryError> {
        self.inner.insert_nutrition_record(record)
    }

    fn category(&self, code: &CategoryCode) -> Result<Option<FoodCategory>, RepositoryError> {
        self.inner.category(code)
    }

    fn categories(&self) -> Result<Vec<FoodCategory>, RepositoryError> {
        self.inner.categories()
    }

    fn insert_category(&self, category: FoodCategory) -> Result<FoodCategory, RepositoryError> {
        self.inner.insert_category(category)
    }

    fn rules_for_category(
        &self,
        category: &CategoryCode,
    ) -> Result<Vec<NutritionRule>, RepositoryError> {
        self.inner.rules_for_category(category)
    }

    fn insert_rule(&self, draft: RuleDraft) -> Result<NutritionRule, RepositoryError> {
        self.inner.insert_rule(draft)
    }

    fn score(
        &self,
        _code: &ProductCode,
        _rule_id: RuleId,
    ) -> Result<Option<WellnessScore>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_score(&self, _score: WellnessScore) -> Result<WellnessScore, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
