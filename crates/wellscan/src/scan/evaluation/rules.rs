use super::super::domain::{NutritionRecord, NutritionalField};
use super::EvaluationContext;

/// Separator some providers emit between ingredients instead of a comma.
const ALTERNATE_DELIMITER: &str = "+++";

enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
}

fn field_value<'a>(
    context: EvaluationContext<'a>,
    field: NutritionalField,
) -> Option<FieldValue<'a>> {
    let record = context.record;
    match field {
        NutritionalField::Category => Some(FieldValue::Text(context.category.as_str())),
        NutritionalField::Ingredients => record.ingredients.as_deref().map(FieldValue::Text),
        NutritionalField::Name => record.item_name.as_deref().map(FieldValue::Text),
        NutritionalField::Sodium => record.nutrients.sodium.map(FieldValue::Number),
        NutritionalField::Sugar => record.nutrients.sugars.map(FieldValue::Number),
    }
}

pub(crate) fn contains(
    context: EvaluationContext<'_>,
    field: NutritionalField,
    needle: &str,
) -> Option<bool> {
    let haystack = match field_value(context, field)? {
        FieldValue::Text(text) => text.to_lowercase(),
        FieldValue::Number(value) => value.to_string(),
    };
    Some(haystack.contains(&needle.to_lowercase()))
}

pub(crate) fn less_than_or_equal(
    context: EvaluationContext<'_>,
    field: NutritionalField,
    threshold: &str,
) -> Option<bool> {
    let observed = match field_value(context, field)? {
        FieldValue::Number(value) => value,
        FieldValue::Text(text) => parse_number(text)?,
    };
    let threshold = parse_number(threshold)?;
    Some(observed <= threshold)
}

pub(crate) fn first_item(record: &NutritionRecord, needle: &str) -> Option<bool> {
    let ingredient = main_ingredient(record.ingredients.as_deref()?);
    Some(ingredient.to_lowercase().contains(&needle.to_lowercase()))
}

/// First entry of an ingredient list once the alternate delimiter has been
/// normalised to a comma.
pub fn main_ingredient(ingredients: &str) -> String {
    let normalized = ingredients.replace(ALTERNATE_DELIMITER, ",");
    normalized
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

