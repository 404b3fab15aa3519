mod policy;
mod rules;

pub use policy::current_rule;
pub use rules::main_ingredient;

use super::domain::{CategoryCode, NutritionRecord, NutritionRule, RuleType, Verdict};

/// Inputs a rule is evaluated against. The requested category is part of the
/// context because `category` rules inspect it rather than the record.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub record: &'a NutritionRecord,
    pub category: &'a CategoryCode,
}

/// Applies a single rule to a nutrition record. Pure over its inputs; any
/// missing field, unparseable number or unknown rule type yields `Unknown`.
pub fn evaluate(context: EvaluationContext<'_>, rule: &NutritionRule) -> Verdict {
    let test = match &rule.rule_type {
        RuleType::Contains => rules::contains(context, rule.field, &rule.value),
        RuleType::LessThanOrEqual => rules::less_than_or_equal(context, rule.field, &rule.value),
        RuleType::FirstItem => rules::first_item(context.record, &rule.value),
        RuleType::Other(kind) => {
            tracing::debug!(rule_id = rule.id.0, %kind, "unrecognised rule type");
            None
        }
    };

    match test {
        Some(passed) => Verdict::from_test(passed, rule.wellness),
        None => Verdict::Unknown,
    }
}
