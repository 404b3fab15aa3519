use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::coerce;
use super::{http_client, NutritionSource, ProviderPayload, SourceError};
use crate::scan::domain::{DataSource, NutritionFacts, NutritionRecord, ProductCode};

pub const DEFAULT_BASE_URL: &str = "https://api.nutritionix.com";

const FIELD_PREFIX: &str = "nf_";

/// Credentials and endpoint for the Nutritionix item API.
#[derive(Debug, Clone)]
pub struct NutritionixConfig {
    pub base_url: String,
    pub app_id: String,
    pub app_key: String,
    pub timeout: Duration,
}

/// Nutritionix item after key normalisation (`nf_` stripped,
/// `ingredient_statement` renamed to `ingredients`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NutritionixItem {
    #[serde(default)]
    pub item_id: Option<Value>,
    #[serde(default)]
    pub item_name: Option<Value>,
    #[serde(default)]
    pub brand_id: Option<Value>,
    #[serde(default)]
    pub brand_name: Option<Value>,
    #[serde(default)]
    pub item_description: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<Value>,
    #[serde(default)]
    pub ingredients: Option<Value>,
    #[serde(default)]
    pub calories: Option<Value>,
    #[serde(default)]
    pub calories_from_fat: Option<Value>,
    #[serde(default)]
    pub total_fat: Option<Value>,
    #[serde(default)]
    pub saturated_fat: Option<Value>,
    #[serde(default)]
    pub cholesterol: Option<Value>,
    #[serde(default)]
    pub sodium: Option<Value>,
    #[serde(default)]
    pub total_carbohydrate: Option<Value>,
    #[serde(default)]
    pub dietary_fiber: Option<Value>,
    #[serde(default)]
    pub sugars: Option<Value>,
    #[serde(default)]
    pub protein: Option<Value>,
    #[serde(default)]
    pub vitamin_a_dv: Option<Value>,
    #[serde(default)]
    pub vitamin_c_dv: Option<Value>,
    #[serde(default)]
    pub calcium_dv: Option<Value>,
    #[serde(default)]
    pub iron_dv: Option<Value>,
    #[serde(default)]
    pub servings_per_container: Option<Value>,
    #[serde(default)]
    pub serving_size_qty: Option<Value>,
    #[serde(default)]
    pub serving_size_unit: Option<Value>,
}

impl NutritionixItem {
    /// Normalises a raw Nutritionix response object into an item.
    pub fn from_raw(raw: Map<String, Value>) -> Result<Self, SourceError> {
        serde_json::from_value(Value::Object(normalize_keys(raw)))
            .map_err(|err| SourceError::Decode(err.to_string()))
    }

    pub fn into_record(self, code: &ProductCode, fetched_at: DateTime<Utc>) -> NutritionRecord {
        let nutrients = NutritionFacts {
            calories: coerce::number(self.calories.as_ref()),
            calories_from_fat: coerce::number(self.calories_from_fat.as_ref()),
            total_fat: coerce::number(self.total_fat.as_ref()),
            saturated_fat: coerce::number(self.saturated_fat.as_ref()),
            cholesterol: coerce::number(self.cholesterol.as_ref()),
            sodium: coerce::number(self.sodium.as_ref()),
            total_carbohydrate: coerce::number(self.total_carbohydrate.as_ref()),
            dietary_fiber: coerce::number(self.dietary_fiber.as_ref()),
            sugars: coerce::number(self.sugars.as_ref()),
            protein: coerce::number(self.protein.as_ref()),
            vitamin_a_dv: coerce::number(self.vitamin_a_dv.as_ref()),
            vitamin_c_dv: coerce::number(self.vitamin_c_dv.as_ref()),
            calcium_dv: coerce::number(self.calcium_dv.as_ref()),
            iron_dv: coerce::number(self.iron_dv.as_ref()),
            servings_per_container: coerce::number(self.servings_per_container.as_ref()),
            serving_size_qty: coerce::number(self.serving_size_qty.as_ref()),
            serving_size_unit: coerce::text(self.serving_size_unit.as_ref()),
        };

        NutritionRecord {
            code: code.clone(),
            item_name: coerce::text(self.item_name.as_ref()),
            brand_id: coerce::text(self.brand_id.as_ref()),
            brand_name: coerce::text(self.brand_name.as_ref()),
            item_image: None,
            item_description: coerce::text(self.item_description.as_ref()),
            ingredients: coerce::text(self.ingredients.as_ref()),
            nutrients,
            data_source: DataSource::Nutritionix,
            source_updated_at: coerce::text(self.updated_at.as_ref())
                .and_then(|raw| coerce::timestamp(&raw)),
            last_updated: fetched_at,
        }
    }

    fn is_product(&self) -> bool {
        coerce::text(self.item_name.as_ref()).is_some()
    }
}

fn normalize_keys(raw: Map<String, Value>) -> Map<String, Value> {
    raw.into_iter()
        .map(|(key, value)| {
            let key = key.strip_prefix(FIELD_PREFIX).unwrap_or(&key).to_string();
            let key = if key == "ingredient_statement" {
                "ingredients".to_string()
            } else {
                key
            };
            (key, value)
        })
        .collect()
}

/// Nutritionix client; consulted only after Open Food Facts misses.
#[derive(Clone)]
pub struct NutritionixSource {
    client: Client,
    config: NutritionixConfig,
}

impl NutritionixSource {
    pub fn new(config: NutritionixConfig) -> Result<Self, SourceError> {
        let client = http_client(config.timeout)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl NutritionSource for NutritionixSource {
    fn data_source(&self) -> DataSource {
        DataSource::Nutritionix
    }

    async fn lookup(&self, code: &ProductCode) -> Result<Option<ProviderPayload>, SourceError> {
        let url = format!(
            "{}/v1_1/item",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .get(url)
            .query(&[
                ("upc", code.as_str()),
                ("appId", self.config.app_id.as_str()),
                ("appKey", self.config.app_key.as_str()),
            ])
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

        let raw: Map<String, Value> = response
            .json()
            .await
            .map_err(|err| SourceError::Decode(err.to_string()))?;
        let item = NutritionixItem::from_raw(raw)?;

        if !item.is_product() {
            return Ok(None);
        }
        Ok(Some(ProviderPayload::Nutritionix(item)))
    }
}
