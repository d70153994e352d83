use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{BlackoutDate, Resource, ScheduleError, ScheduleRule};

use super::ScheduleStore;

#[derive(Default)]
struct ScheduleTables {
    resources: Vec<Resource>,
    rules: Vec<ScheduleRule>,
    blackouts: Vec<BlackoutDate>,
}

/// Process-local schedule storage, used when Supabase is not configured and
/// in tests.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    tables: RwLock<ScheduleTables>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn list_resources(&self) -> Result<Vec<Resource>, ScheduleError> {
        let mut resources = self.tables.read().await.resources.clone();
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(resources)
    }

    async fn insert_resource(&self, resource: Resource) -> Result<Resource, ScheduleError> {
        self.tables.write().await.resources.push(resource.clone());
        Ok(resource)
    }

    async fn list_rules(&self) -> Result<Vec<ScheduleRule>, ScheduleError> {
        let mut rules = self.tables.read().await.rules.clone();
        rules.sort_by_key(|rule| (rule.day_of_week, rule.open_time));
        Ok(rules)
    }

    async fn get_rule(&self, rule_id: Uuid) -> Result<ScheduleRule, ScheduleError> {
        self.tables
            .read()
            .await
            .rules
            .iter()
            .find(|rule| rule.id == rule_id)
            .cloned()
            .ok_or(ScheduleError::RuleNotFound)
    }

    async fn insert_rule(&self, rule: ScheduleRule) -> Result<ScheduleRule, ScheduleError> {
        self.tables.write().await.rules.push(rule.clone());
        Ok(rule)
    }

    async fn update_rule(&self, rule: ScheduleRule) -> Result<ScheduleRule, ScheduleError> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .rules
            .iter_mut()
            .find(|existing| existing.id == rule.id)
            .ok_or(ScheduleError::RuleNotFound)?;
        *existing = rule.clone();
        Ok(rule)
    }

    async fn delete_rule(&self, rule_id: Uuid) -> Result<(), ScheduleError> {
        let mut tables = self.tables.write().await;
        let before = tables.rules.len();
        tables.rules.retain(|rule| rule.id != rule_id);
        if tables.rules.len() == before {
            return Err(ScheduleError::RuleNotFound);
        }
        Ok(())
    }

    async fn list_blackouts(&self) -> Result<Vec<BlackoutDate>, ScheduleError> {
        let mut blackouts = self.tables.read().await.blackouts.clone();
        blackouts.sort_by_key(|blackout| blackout.date);
        Ok(blackouts)
    }

    async fn insert_blackout(&self, blackout: BlackoutDate) -> Result<BlackoutDate, ScheduleError> {
        self.tables.write().await.blackouts.push(blackout.clone());
        Ok(blackout)
    }

    async fn delete_blackout(&self, blackout_id: Uuid) -> Result<(), ScheduleError> {
        let mut tables = self.tables.write().await;
        let before = tables.blackouts.len();
        tables.blackouts.retain(|blackout| blackout.id != blackout_id);
        if tables.blackouts.len() == before {
            return Err(ScheduleError::BlackoutNotFound);
        }
        Ok(())
    }
}
