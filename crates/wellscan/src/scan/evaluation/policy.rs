use super::super::domain::NutritionRule;

/// Selects the rule in force among a category's rules: the latest
/// `created_at`, ties going to the higher (later inserted) id.
pub fn current_rule(rules: &[NutritionRule]) -> Option<&NutritionRule> {
    rules
        .iter()
        .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::domain::{CategoryCode, NutritionalField, RuleId, RuleType};
    use chrono::{TimeZone, Utc};

    fn rule(id: u64, day: u32) -> NutritionRule {
        NutritionRule {
            id: RuleId(id),
            category: CategoryCode("27".to_string()),
            nutrient: None,
            field: NutritionalField::Sodium,
            rule_type: RuleType::LessThanOrEqual,
            value: "200".to_string(),
            wellness: true,
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn newest_rule_wins() {
        let rules = vec![rule(1, 1), rule(2, 9), rule(3, 4)];
        assert_eq!(current_rule(&rules).map(|r| r.id), Some(RuleId(2)));
    }

    #[test]
    fn later_insert_breaks_timestamp_ties() {
        let rules = vec![rule(5, 2), rule(4, 2)];
        assert_eq!(current_rule(&rules).map(|r| r.id), Some(RuleId(5)));
    }

    #[test]
    fn empty_rule_set_has_no_current_rule() {
        assert!(current_rule(&[]).is_none());
    }
}
