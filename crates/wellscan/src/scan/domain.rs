use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Scanned product code (UPC/EAN digits) as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductCode(pub String);

impl ProductCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short load code identifying a food category (e.g. `"27"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryCode(pub String);

impl CategoryCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned identifier for a nutrition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub u64);

/// Origin of a stored nutrition record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    OpenFoodFacts,
    Nutritionix,
    Manual,
    Seed,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::OpenFoodFacts => "Open Food Facts",
            DataSource::Nutritionix => "Nutritionix",
            DataSource::Manual => "Manual entry",
            DataSource::Seed => "Seed catalog",
        }
    }
}

/// Numeric nutrition panel. Every value is optional; a provider that omits a
/// nutrient (or reports it empty) leaves it `None` rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub calories_from_fat: Option<f64>,
    #[serde(default)]
    pub total_fat: Option<f64>,
    #[serde(default)]
    pub saturated_fat: Option<f64>,
    #[serde(default)]
    pub cholesterol: Option<f64>,
    #[serde(default)]
    pub sodium: Option<f64>,
    #[serde(default)]
    pub total_carbohydrate: Option<f64>,
    #[serde(default)]
    pub dietary_fiber: Option<f64>,
    #[serde(default)]
    pub sugars: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub vitamin_a_dv: Option<f64>,
    #[serde(default)]
    pub vitamin_c_dv: Option<f64>,
    #[serde(default)]
    pub calcium_dv: Option<f64>,
    #[serde(default)]
    pub iron_dv: Option<f64>,
    #[serde(default)]
    pub servings_per_container: Option<f64>,
    #[serde(default)]
    pub serving_size_qty: Option<f64>,
    #[serde(default)]
    pub serving_size_unit: Option<String>,
}

/// Canonical nutrition record shared by every data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub code: ProductCode,
    pub item_name: Option<String>,
    pub brand_id: Option<String>,
    pub brand_name: Option<String>,
    pub item_image: Option<String>,
    pub item_description: Option<String>,
    pub ingredients: Option<String>,
    #[serde(flatten)]
    pub nutrients: NutritionFacts,
    pub data_source: DataSource,
    /// Last edit reported by the provider, when it exposes one.
    pub source_updated_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

/// Caller-supplied nutrition details for products no provider knows about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualEntry {
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub item_description: Option<String>,
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(flatten)]
    pub nutrients: NutritionFacts,
}

impl ManualEntry {
    pub fn into_record(self, code: ProductCode, now: DateTime<Utc>) -> NutritionRecord {
        NutritionRecord {
            code,
            item_name: self.item_name,
            brand_id: None,
            brand_name: self.brand_name,
            item_image: None,
            item_description: self.item_description,
            ingredients: self.ingredients,
            nutrients: self.nutrients,
            data_source: DataSource::Manual,
            source_updated_at: None,
            last_updated: now,
        }
    }
}

/// Food category seeded from the catalog; read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodCategory {
    pub code: CategoryCode,
    pub abbr: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// Nutrient a rule is concerned with. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Fiber,
    Sodium,
    Sugar,
}

impl FromStr for Nutrient {
    type Err = DomainParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "fiber" => Ok(Self::Fiber),
            "2" | "sodium" => Ok(Self::Sodium),
            "3" | "sugar" => Ok(Self::Sugar),
            _ => Err(DomainParseError::new("nutrient", value)),
        }
    }
}

/// Record attribute (or derived value) a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutritionalField {
    Category,
    Ingredients,
    Name,
    Sodium,
    Sugar,
}

impl FromStr for NutritionalField {
    type Err = DomainParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "category" => Ok(Self::Category),
            "2" | "ingredients" => Ok(Self::Ingredients),
            "3" | "name" | "item_name" => Ok(Self::Name),
            "4" | "sodium" => Ok(Self::Sodium),
            "5" | "sugar" | "sugars" => Ok(Self::Sugar),
            _ => Err(DomainParseError::new("nutritional field", value)),
        }
    }
}

/// Comparison strategy encoded by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Contains,
    FirstItem,
    LessThanOrEqual,
    /// Unrecognised rule type carried over from seed data verbatim.
    Other(String),
}

impl RuleType {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "contains" => Self::Contains,
            "2" | "first_item" | "firstitem" => Self::FirstItem,
            "3" | "lte" | "lessthanorequal" | "less_than_or_equal" => Self::LessThanOrEqual,
            _ => Self::Other(value.trim().to_string()),
        }
    }
}

/// Versioned wellness rule for a food category. Rules are never edited;
/// a newer rule supersedes older ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRule {
    pub id: RuleId,
    pub category: CategoryCode,
    pub nutrient: Option<Nutrient>,
    pub field: NutritionalField,
    pub rule_type: RuleType,
    pub value: String,
    /// Outcome of the rule's test that counts as "well".
    pub wellness: bool,
    pub created_at: DateTime<Utc>,
}

/// Rule contents before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDraft {
    pub category: CategoryCode,
    pub nutrient: Option<Nutrient>,
    pub field: NutritionalField,
    pub rule_type: RuleType,
    pub value: String,
    pub wellness: bool,
    pub created_at: DateTime<Utc>,
}

impl RuleDraft {
    pub fn into_rule(self, id: RuleId) -> NutritionRule {
        NutritionRule {
            id,
            category: self.category,
            nutrient: self.nutrient,
            field: self.field,
            rule_type: self.rule_type,
            value: self.value,
            wellness: self.wellness,
            created_at: self.created_at,
        }
    }
}

/// Tri-state wellness outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Well,
    NotWell,
    Unknown,
}

impl Verdict {
    /// Maps a rule's boolean test onto a verdict given the rule polarity.
    pub fn from_test(passed: bool, wellness: bool) -> Self {
        if passed == wellness {
            Verdict::Well
        } else {
            Verdict::NotWell
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Well => "WELLNESS",
            Verdict::NotWell => "NOT WELLNESS",
            Verdict::Unknown => "UNKNOWN",
        }
    }
}

/// Append-only record of one rule evaluated against one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessScore {
    pub code: ProductCode,
    pub rule_id: RuleId,
    pub verdict: Verdict,
    pub created_at: DateTime<Utc>,
}

/// Where the data behind a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// A wellness score already existed for the product and rule.
    ScoreCached,
    /// The nutrition record was already stored; no provider was consulted.
    AlreadyKnown,
    Source(DataSource),
    Unresolved,
}

impl Provenance {
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::ScoreCached => "score_cached",
            Provenance::AlreadyKnown => "already_known",
            Provenance::Source(DataSource::OpenFoodFacts) => "open_food_facts",
            Provenance::Source(DataSource::Nutritionix) => "nutritionix",
            Provenance::Source(DataSource::Manual) => "manual",
            Provenance::Source(DataSource::Seed) => "seed",
            Provenance::Unresolved => "unresolved",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Provenance::ScoreCached => "Wellness score already calculated.".to_string(),
            Provenance::AlreadyKnown => "Already in database".to_string(),
            Provenance::Source(source) => format!("Item found in {}", source.label()),
            Provenance::Unresolved => {
                "API error or item not found. Please enter item details via app.".to_string()
            }
        }
    }
}

impl Serialize for Provenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Result of a pipeline evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellnessResult {
    pub record: NutritionRecord,
    pub rule_id: RuleId,
    pub verdict: Verdict,
    pub provenance: Provenance,
}

/// Raised when seed or request data names an unknown enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind} '{value}'")]
pub struct DomainParseError {
    pub kind: &'static str,
    pub value: String,
}

impl DomainParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.trim().to_string(),
        }
    }
}
