use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::domain::{
    CategoryCode, FoodCategory, NutritionRecord, NutritionRule, ProductCode, RuleDraft, RuleId,
    WellnessScore,
};
use super::repository::{NutritionRepository, RepositoryError};

#[derive(Default)]
struct MemoryState {
    records: HashMap<ProductCode, NutritionRecord>,
    categories: BTreeMap<CategoryCode, FoodCategory>,
    rules: Vec<NutritionRule>,
    scores: Vec<WellnessScore>,
    next_rule_id: u64,
}

/// Process-local repository used by the service binary and the test suites.
#[derive(Default, Clone)]
pub struct InMemoryNutritionRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryNutritionRepository {
    pub fn record_count(&self) -> usize {
        self.state.lock().expect("repository mutex poisoned").records.len()
    }

    pub fn score_count(&self) -> usize {
        self.state.lock().expect("repository mutex poisoned").scores.len()
    }

    pub fn scores(&self) -> Vec<WellnessScore> {
        self.state
            .lock()
            .expect("repository mutex poisoned")
            .scores
            .clone()
    }
}

impl NutritionRepository for InMemoryNutritionRepository {
    fn nutrition_record(
        &self,
        code: &ProductCode,
    ) -> Result<Option<NutritionRecord>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard.records.get(code).cloned())
    }

    fn insert_nutrition_record(
        &self,
        record: NutritionRecord,
    ) -> Result<NutritionRecord, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        let stored = guard
            .records
            .entry(record.code.clone())
            .or_insert(record)
            .clone();
        Ok(stored)
    }

    fn category(&self, code: &CategoryCode) -> Result<Option<FoodCategory>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard.categories.get(code).cloned())
    }

    fn categories(&self) -> Result<Vec<FoodCategory>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard.categories.values().cloned().collect())
    }

    fn insert_category(&self, category: FoodCategory) -> Result<FoodCategory, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        if guard.categories.contains_key(&category.code) {
            return Err(RepositoryError::Conflict);
        }
        guard
            .categories
            .insert(category.code.clone(), category.clone());
        Ok(category)
    }

    fn rules_for_category(
        &self,
        category: &CategoryCode,
    ) -> Result<Vec<NutritionRule>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard
            .rules
            .iter()
            .filter(|rule| &rule.category == category)
            .cloned()
            .collect())
    }

    fn insert_rule(&self, draft: RuleDraft) -> Result<NutritionRule, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        if !guard.categories.contains_key(&draft.category) {
            return Err(RepositoryError::NotFound);
        }
        guard.next_rule_id += 1;
        let rule = draft.into_rule(RuleId(guard.next_rule_id));
        guard.rules.push(rule.clone());
        Ok(rule)
    }

    fn score(
        &self,
        code: &ProductCode,
        rule_id: RuleId,
    ) -> Result<Option<WellnessScore>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard
            .scores
            .iter()
            .filter(|score| &score.code == code && score.rule_id == rule_id)
            .max_by_key(|score| score.created_at)
            .cloned())
    }

    fn insert_score(&self, score: WellnessScore) -> Result<WellnessScore, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        guard.scores.push(score.clone());
        Ok(score)
    }
}
