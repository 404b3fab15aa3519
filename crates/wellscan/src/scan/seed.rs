use std::io::Read;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Deserializer};

use super::domain::{
    CategoryCode, DataSource, DomainParseError, FoodCategory, Nutrient, NutritionFacts,
    NutritionRecord, NutritionalField, ProductCode, RuleDraft, RuleType,
};
use super::repository::{NutritionRepository, RepositoryError};

pub const CATEGORIES_FILE: &str = "categories.csv";
pub const RULES_FILE: &str = "nutrules.csv";
pub const PRODUCTS_FILE: &str = "products.csv";

#[derive(Debug)]
pub enum SeedImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, reason: String },
    UnknownCategory { line: u64, category: String },
    Repository(RepositoryError),
}

impl std::fmt::Display for SeedImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedImportError::Io(err) => write!(f, "failed to read seed file: {}", err),
            SeedImportError::Csv(err) => write!(f, "invalid seed CSV data: {}", err),
            SeedImportError::InvalidRow { line, reason } => {
                write!(f, "invalid seed row at line {}: {}", line, reason)
            }
            SeedImportError::UnknownCategory { line, category } => write!(
                f,
                "rule at line {} references unknown food category '{}'",
                line, category
            ),
            SeedImportError::Repository(err) => write!(f, "could not store seed data: {}", err),
        }
    }
}

impl std::error::Error for SeedImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SeedImportError::Io(err) => Some(err),
            SeedImportError::Csv(err) => Some(err),
            SeedImportError::Repository(err) => Some(err),
            SeedImportError::InvalidRow { .. } | SeedImportError::UnknownCategory { .. } => None,
        }
    }
}

impl From<std::io::Error> for SeedImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for SeedImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for SeedImportError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

/// Counts of rows loaded by a seed import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub rules: usize,
    pub products: usize,
}

/// Loads category, rule and product catalogs from CSV exports.
pub struct SeedImporter;

impl SeedImporter {
    /// Imports `categories.csv`, `nutrules.csv` and, when present,
    /// `products.csv` from a directory. Categories load first so rules can
    /// reference them.
    pub fn from_dir<P, R>(dir: P, repository: &R) -> Result<SeedSummary, SeedImportError>
    where
        P: AsRef<Path>,
        R: NutritionRepository + ?Sized,
    {
        let dir = dir.as_ref();
        let categories_file = std::fs::File::open(dir.join(CATEGORIES_FILE))?;
        let categories = Self::categories_from_reader(categories_file, repository)?;
        let rules_file = std::fs::File::open(dir.join(RULES_FILE))?;
        let rules = Self::rules_from_reader(rules_file, repository)?;

        let products_path = dir.join(PRODUCTS_FILE);
        let products = if products_path.exists() {
            Self::products_from_reader(std::fs::File::open(products_path)?, repository)?
        } else {
            0
        };

        let summary = SeedSummary {
            categories,
            rules,
            products,
        };
        tracing::info!(
            categories = summary.categories,
            rules = summary.rules,
            products = summary.products,
            dir = %dir.display(),
            "seed data imported"
        );
        Ok(summary)
    }

    pub fn categories_from_reader<T, R>(
        reader: T,
        repository: &R,
    ) -> Result<usize, SeedImportError>
    where
        T: Read,
        R: NutritionRepository + ?Sized,
    {
        let mut count = 0;
        for row in csv_reader(reader).deserialize::<CategoryRow>() {
            let row = row?;
            repository.insert_category(FoodCategory {
                code: CategoryCode(row.load_cat),
                abbr: row.abbr,
                name: row.name,
                description: row.description,
                notes: row.notes,
            })?;
            count += 1;
        }
        Ok(count)
    }

    pub fn rules_from_reader<T, R>(
        reader: T,
        repository: &R,
    ) -> Result<usize, SeedImportError>
    where
        T: Read,
        R: NutritionRepository + ?Sized,
    {
        let mut csv_reader = csv_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut count = 0;
        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            let row: RuleRow = record.deserialize(Some(&headers))?;
            let category = CategoryCode(row.load_cat.clone());
            if repository.category(&category)?.is_none() {
                return Err(SeedImportError::UnknownCategory {
                    line,
                    category: row.load_cat,
                });
            }

            let draft = row.into_draft(category).map_err(|err| SeedImportError::InvalidRow {
                line,
                reason: err.to_string(),
            })?;
            repository.insert_rule(draft)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn products_from_reader<T, R>(
        reader: T,
        repository: &R,
    ) -> Result<usize, SeedImportError>
    where
        T: Read,
        R: NutritionRepository + ?Sized,
    {
        let now = Utc::now();
        let mut count = 0;
        for row in csv_reader(reader).deserialize::<ProductRow>() {
            let row = row?;
            repository.insert_nutrition_record(row.into_record(now))?;
            count += 1;
        }
        Ok(count)
    }
}

fn csv_reader<T: Read>(reader: T) -> csv::Reader<T> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    load_cat: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    abbr: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RuleRow {
    load_cat: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    nutrient: Option<String>,
    nutritional_field: String,
    rule_type: String,
    #[serde(default)]
    value: String,
    wellness: String,
}

impl RuleRow {
    fn into_draft(self, category: CategoryCode) -> Result<RuleDraft, DomainParseError> {
        let field = self.nutritional_field.parse::<NutritionalField>()?;
        let nutrient = self
            .nutrient
            .as_deref()
            .map(str::parse::<Nutrient>)
            .transpose()?;
        let wellness = parse_flag(&self.wellness).ok_or_else(|| DomainParseError {
            kind: "wellness flag",
            value: self.wellness.clone(),
        })?;

        Ok(RuleDraft {
            category,
            nutrient,
            field,
            rule_type: RuleType::parse(&self.rule_type),
            value: self.value,
            wellness,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    upc_code: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    item_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    brand_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    brand_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    item_image: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    item_description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    ingredients: Option<String>,
    #[serde(default)]
    calories: Option<f64>,
    #[serde(default)]
    calories_from_fat: Option<f64>,
    #[serde(default)]
    total_fat: Option<f64>,
    #[serde(default)]
    saturated_fat: Option<f64>,
    #[serde(default)]
    cholesterol: Option<f64>,
    #[serde(default)]
    sodium: Option<f64>,
    #[serde(default)]
    total_carb: Option<f64>,
    #[serde(default)]
    dietary_fiber: Option<f64>,
    #[serde(default)]
    sugars: Option<f64>,
    #[serde(default)]
    protein: Option<f64>,
    #[serde(default)]
    vitamin_a_dv: Option<f64>,
    #[serde(default)]
    vitamin_c_dv: Option<f64>,
    #[serde(default)]
    calcium_dv: Option<f64>,
    #[serde(default)]
    iron_dv: Option<f64>,
    #[serde(default)]
    serving_per_cont: Option<f64>,
    #[serde(default)]
    serving_size_qty: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    serving_size_unit: Option<String>,
}

impl ProductRow {
    fn into_record(self, now: chrono::DateTime<Utc>) -> NutritionRecord {
        NutritionRecord {
            code: ProductCode(self.upc_code),
            item_name: self.item_name,
            brand_id: self.brand_id,
            brand_name: self.brand_name,
            item_image: self.item_image,
            item_description: self.item_description,
            ingredients: self.ingredients,
            nutrients: NutritionFacts {
                calories: self.calories,
                calories_from_fat: self.calories_from_fat,
                total_fat: self.total_fat,
                saturated_fat: self.saturated_fat,
                cholesterol: self.cholesterol,
                sodium: self.sodium,
                total_carbohydrate: self.total_carb,
                dietary_fiber: self.dietary_fiber,
                sugars: self.sugars,
                protein: self.protein,
                vitamin_a_dv: self.vitamin_a_dv,
                vitamin_c_dv: self.vitamin_c_dv,
                calcium_dv: self.calcium_dv,
                iron_dv: self.iron_dv,
                servings_per_container: self.serving_per_cont,
                serving_size_qty: self.serving_size_qty,
                serving_size_unit: self.serving_size_unit,
            },
            data_source: DataSource::Seed,
            source_updated_at: None,
            last_updated: now,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
