use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use wellscan::scan::{
    CategoryCode, DataSource, FoodCategory, InMemoryNutritionRepository, NutritionRepository,
    NutritionSource, NutritionalField, NutritionixConfig, NutritionixSource, OpenFoodFactsConfig,
    OpenFoodFactsSource, PipelineError, ProductCode, Provenance, RuleDraft, RuleType, Verdict,
    WellnessPipeline,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CODE: &str = "000000000001";

fn repository() -> Arc<InMemoryNutritionRepository> {
    let repository = Arc::new(InMemoryNutritionRepository::default());
    repository
        .insert_category(FoodCategory {
            code: CategoryCode("27".to_string()),
            abbr: Some("SNK".to_string()),
            name: Some("Snacks".to_string()),
            description: None,
            notes: None,
        })
        .expect("category inserted");
    repository
        .insert_rule(RuleDraft {
            category: CategoryCode("27".to_string()),
            nutrient: None,
            field: NutritionalField::Sodium,
            rule_type: RuleType::LessThanOrEqual,
            value: "200".to_string(),
            wellness: true,
            created_at: Utc::now(),
        })
        .expect("rule inserted");
    repository
}

fn sources(server: &MockServer) -> Vec<Arc<dyn NutritionSource>> {
    let timeout = Duration::from_millis(500);
    let off = OpenFoodFactsSource::new(OpenFoodFactsConfig {
        base_url: server.uri(),
        timeout,
    })
    .expect("off client");
    let nutritionix = NutritionixSource::new(NutritionixConfig {
        base_url: server.uri(),
        app_id: "app".to_string(),
        app_key: "key".to_string(),
        timeout,
    })
    .expect("nutritionix client");
    let off: Arc<dyn NutritionSource> = Arc::new(off);
    let nutritionix: Arc<dyn NutritionSource> = Arc::new(nutritionix);
    vec![off, nutritionix]
}

async fn mount_off(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v0/product/{CODE}.json")))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn mount_nutritionix(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/v1_1/item"))
        .and(query_param("upc", CODE))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn open_food_facts_hit_is_scored_and_stored() {
    let server = MockServer::start().await;
    mount_off(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "status": 1,
            "product": {
                "product_name": "Salted Crackers",
                "ingredients_text": "flour, salt",
                "nutriments": { "sodium": "140" }
            }
        })),
    )
    .await;
    let repository = repository();
    let pipeline = WellnessPipeline::new(repository.clone(), sources(&server));

    let result = pipeline
        .evaluate(&ProductCode(CODE.to_string()), &CategoryCode("27".to_string()))
        .await
        .expect("scan resolves");

    assert_eq!(result.verdict, Verdict::Well);
    assert_eq!(
        result.provenance,
        Provenance::Source(DataSource::OpenFoodFacts)
    );
    assert_eq!(repository.record_count(), 1);
    assert_eq!(repository.score_count(), 1);
}

#[tokio::test]
async fn nutritionix_answers_when_open_food_facts_misses() {
    let server = MockServer::start().await;
    mount_off(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "status": 0 })),
    )
    .await;
    mount_nutritionix(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "item_name": "Crackers",
            "nf_sodium": 310,
            "nf_ingredient_statement": "flour, salt"
        })),
    )
    .await;
    let pipeline = WellnessPipeline::new(repository(), sources(&server));

    let result = pipeline
        .evaluate(&ProductCode(CODE.to_string()), &CategoryCode("27".to_string()))
        .await
        .expect("scan resolves");

    assert_eq!(result.provenance, Provenance::Source(DataSource::Nutritionix));
    assert_eq!(result.record.nutrients.sodium, Some(310.0));
    assert_eq!(result.verdict, Verdict::NotWell);
}

#[tokio::test]
async fn outages_on_every_provider_leave_no_trace() {
    let server = MockServer::start().await;
    mount_off(&server, ResponseTemplate::new(503)).await;
    mount_nutritionix(
        &server,
        ResponseTemplate::new(200).set_delay(Duration::from_secs(2)),
    )
    .await;
    let repository = repository();
    let pipeline = WellnessPipeline::new(repository.clone(), sources(&server));

    let outcome = pipeline
        .evaluate(&ProductCode(CODE.to_string()), &CategoryCode("27".to_string()))
        .await;

    assert!(matches!(outcome, Err(PipelineError::DataUnresolved { .. })));
    assert_eq!(repository.record_count(), 0);
    assert_eq!(repository.score_count(), 0);
}
