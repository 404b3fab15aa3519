use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::coerce;
use super::{http_client, NutritionSource, ProviderPayload, SourceError};
use crate::scan::domain::{DataSource, NutritionFacts, NutritionRecord, ProductCode};

pub const DEFAULT_BASE_URL: &str = "https://world.openfoodfacts.org";

const KJ_PER_KCAL: f64 = 4.184;

/// Settings for the unauthenticated Open Food Facts product API.
#[derive(Debug, Clone)]
pub struct OpenFoodFactsConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenFoodFactsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductEnvelope {
    #[serde(default)]
    status: Value,
    #[serde(default)]
    product: Option<OpenFoodFactsProduct>,
}

/// Subset of the Open Food Facts product document the pipeline consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenFoodFactsProduct {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub brands: Option<String>,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub ingredients: Option<Vec<OpenFoodFactsIngredient>>,
    #[serde(default)]
    pub ingredients_text: Option<String>,
    #[serde(default)]
    pub last_edit_dates_tags: Option<Vec<String>>,
    #[serde(default)]
    pub last_modified_t: Option<i64>,
    #[serde(default)]
    pub nutriments: Option<Map<String, Value>>,
    #[serde(default)]
    pub serving_quantity: Option<Value>,
    #[serde(default)]
    pub serving_size: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenFoodFactsIngredient {
    #[serde(default)]
    pub text: Option<String>,
}

impl OpenFoodFactsProduct {
    pub fn into_record(self, code: &ProductCode, fetched_at: DateTime<Utc>) -> NutritionRecord {
        let nutriments = self.nutriments.unwrap_or_default();
        let nutrient = |key: &str| coerce::number(nutriments.get(key));

        let nutrients = NutritionFacts {
            calories: calories(&nutriments),
            total_fat: nutrient("fat"),
            saturated_fat: nutrient("saturated-fat"),
            sodium: nutrient("sodium"),
            total_carbohydrate: nutrient("carbohydrates"),
            dietary_fiber: nutrient("fiber"),
            sugars: nutrient("sugars"),
            protein: nutrient("proteins"),
            serving_size_qty: coerce::number(self.serving_quantity.as_ref()),
            serving_size_unit: self.serving_size.as_deref().and_then(coerce::alphabetic),
            ..NutritionFacts::default()
        };

        let ingredients = flatten_ingredients(self.ingredients.as_deref())
            .or_else(|| non_empty(self.ingredients_text));

        let source_updated_at = self
            .last_edit_dates_tags
            .as_ref()
            .and_then(|tags| tags.first())
            .and_then(|tag| coerce::timestamp(tag))
            .or_else(|| {
                self.last_modified_t
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
            });

        NutritionRecord {
            code: code.clone(),
            item_name: non_empty(self.product_name),
            brand_id: None,
            brand_name: non_empty(self.brands),
            item_image: non_empty(self.image_url),
            item_description: non_empty(self.generic_name),
            ingredients,
            nutrients,
            data_source: DataSource::OpenFoodFacts,
            source_updated_at,
            last_updated: fetched_at,
        }
    }
}

/// Energy in kcal. Prefers the explicit `energy-kcal` value and converts
/// kilojoule readings otherwise.
fn calories(nutriments: &Map<String, Value>) -> Option<f64> {
    if let Some(kcal) = coerce::number(nutriments.get("energy-kcal")) {
        return Some(kcal);
    }

    let energy = coerce::number(nutriments.get("energy"))?;
    let unit = nutriments
        .get("energy_unit")
        .and_then(Value::as_str)
        .map(|unit| unit.trim().to_ascii_lowercase());
    match unit.as_deref() {
        Some("kcal") => Some(energy),
        Some("kj") => Some((energy / KJ_PER_KCAL * 10.0).round() / 10.0),
        _ => None,
    }
}

fn flatten_ingredients(ingredients: Option<&[OpenFoodFactsIngredient]>) -> Option<String> {
    let joined = ingredients?
        .iter()
        .filter_map(|item| item.text.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Open Food Facts client; first in the fallback order because it is free.
#[derive(Clone)]
pub struct OpenFoodFactsSource {
    client: Client,
    config: OpenFoodFactsConfig,
}

impl OpenFoodFactsSource {
    pub fn new(config: OpenFoodFactsConfig) -> Result<Self, SourceError> {
        let client = http_client(config.timeout)?;
        Ok(Self { client, config })
    }

    fn product_url(&self, code: &ProductCode) -> String {
        format!(
            "{}/api/v0/product/{}.json",
            self.config.base_url.trim_end_matches('/'),
            code
        )
    }
}

#[async_trait]
impl NutritionSource for OpenFoodFactsSource {
    fn data_source(&self) -> DataSource {
        DataSource::OpenFoodFacts
    }

    async fn lookup(&self, code: &ProductCode) -> Result<Option<ProviderPayload>, SourceError> {
        let response = self
            .client
            .get(self.product_url(code))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let envelope: ProductEnvelope = response
            .json()
            .await
            .map_err(|err| SourceError::Decode(err.to_string()))?;

        if envelope.status.as_i64() != Some(1) {
            return Ok(None);
        }

        Ok(envelope.product.map(ProviderPayload::OpenFoodFacts))
    }
}
