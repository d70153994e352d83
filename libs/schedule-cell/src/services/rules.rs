// libs/schedule-cell/src/services/rules.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    BlackoutDate, CreateBlackoutRequest, CreateResourceRequest, CreateScheduleRuleRequest, Resource,
    ScheduleError, ScheduleRule, UpdateScheduleRuleRequest,
};
use crate::services::store::ScheduleStore;

/// Administrative edits of the clinic calendar. Admin traffic is rare, so
/// validation is a plain read-then-write against the store.
pub struct ScheduleRuleService {
    store: Arc<dyn ScheduleStore>,
}

impl ScheduleRuleService {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    // ==========================================================================
    // RESOURCES
    // ==========================================================================

    pub async fn list_resources(&self, active_only: bool) -> Result<Vec<Resource>, ScheduleError> {
        let resources = self.store.list_resources().await?;
        Ok(resources
            .into_iter()
            .filter(|resource| !active_only || resource.is_active)
            .collect())
    }

    pub async fn create_resource(&self, request: CreateResourceRequest) -> Result<Resource, ScheduleError> {
        let name = request.name.trim();
        if name.is_empty() || name.chars().count() > 100 {
            return Err(ScheduleError::ValidationError(
                "Resource name must be between 1 and 100 characters".to_string(),
            ));
        }

        let resource = Resource {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind: request.kind,
            is_active: true,
            created_at: Utc::now(),
        };

        let created = self.store.insert_resource(resource).await?;
        info!("Resource {} ({}) created", created.name, created.id);
        Ok(created)
    }

    // ==========================================================================
    // RULES
    // ==========================================================================

    pub async fn list_rules(&self) -> Result<Vec<ScheduleRule>, ScheduleError> {
        self.store.list_rules().await
    }

    pub async fn create_rule(&self, request: CreateScheduleRuleRequest) -> Result<ScheduleRule, ScheduleError> {
        if !(0..=6).contains(&request.day_of_week) {
            return Err(ScheduleError::ValidationError(
                "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }

        if request.open_time >= request.close_time {
            return Err(ScheduleError::ValidationError(
                "Open time must be before close time".to_string(),
            ));
        }

        if let Some(resource_id) = request.resource_id {
            self.ensure_resource_exists(resource_id).await?;
        }

        let now = Utc::now();
        let rule = ScheduleRule {
            id: Uuid::new_v4(),
            resource_id: request.resource_id,
            day_of_week: request.day_of_week,
            open_time: request.open_time,
            close_time: request.close_time,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.ensure_no_overlap(&rule).await?;

        let created = self.store.insert_rule(rule).await?;
        info!(
            "Schedule rule {} created: day {} {}-{}",
            created.id, created.day_of_week, created.open_time, created.close_time
        );
        Ok(created)
    }

    pub async fn update_rule(
        &self,
        rule_id: Uuid,
        request: UpdateScheduleRuleRequest,
    ) -> Result<ScheduleRule, ScheduleError> {
        let mut rule = self.store.get_rule(rule_id).await?;

        if let Some(open_time) = request.open_time {
            rule.open_time = open_time;
        }
        if let Some(close_time) = request.close_time {
            rule.close_time = close_time;
        }
        if let Some(is_active) = request.is_active {
            rule.is_active = is_active;
        }

        if rule.open_time >= rule.close_time {
            return Err(ScheduleError::ValidationError(
                "Open time must be before close time".to_string(),
            ));
        }

        if rule.is_active {
            self.ensure_no_overlap(&rule).await?;
        }

        rule.updated_at = Utc::now();
        let updated = self.store.update_rule(rule).await?;
        info!("Schedule rule {} updated", updated.id);
        Ok(updated)
    }

    pub async fn delete_rule(&self, rule_id: Uuid) -> Result<(), ScheduleError> {
        self.store.delete_rule(rule_id).await?;
        info!("Schedule rule {} deleted", rule_id);
        Ok(())
    }

    // ==========================================================================
    // BLACKOUT DATES
    // ==========================================================================

    pub async fn list_blackouts(&self) -> Result<Vec<BlackoutDate>, ScheduleError> {
        self.store.list_blackouts().await
    }

    pub async fn create_blackout(&self, request: CreateBlackoutRequest) -> Result<BlackoutDate, ScheduleError> {
        if let Some(resource_id) = request.resource_id {
            self.ensure_resource_exists(resource_id).await?;
        }

        let blackout = BlackoutDate {
            id: Uuid::new_v4(),
            date: request.date,
            resource_id: request.resource_id,
            reason: request
                .reason
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty()),
            created_at: Utc::now(),
        };

        let created = self.store.insert_blackout(blackout).await?;
        info!("Blackout date {} created for {}", created.id, created.date);
        Ok(created)
    }

    pub async fn delete_blackout(&self, blackout_id: Uuid) -> Result<(), ScheduleError> {
        self.store.delete_blackout(blackout_id).await?;
        info!("Blackout date {} deleted", blackout_id);
        Ok(())
    }

    async fn ensure_resource_exists(&self, resource_id: Uuid) -> Result<(), ScheduleError> {
        let exists = self
            .store
            .list_resources()
            .await?
            .iter()
            .any(|resource| resource.id == resource_id);

        if exists {
            Ok(())
        } else {
            Err(ScheduleError::ResourceNotFound)
        }
    }

    async fn ensure_no_overlap(&self, candidate: &ScheduleRule) -> Result<(), ScheduleError> {
        let clash = self
            .store
            .list_rules()
            .await?
            .into_iter()
            .filter(|existing| existing.is_active && existing.id != candidate.id)
            .find(|existing| existing.shares_scope_with(candidate) && existing.window_overlaps(candidate));

        match clash {
            Some(existing) => {
                warn!(
                    "Schedule rule {}-{} on day {} overlaps rule {}",
                    candidate.open_time, candidate.close_time, candidate.day_of_week, existing.id
                );
                Err(ScheduleError::OverlappingRule)
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveTime;

    use crate::models::ResourceKind;
    use crate::services::store::InMemoryScheduleStore;

    fn service() -> ScheduleRuleService {
        ScheduleRuleService::new(Arc::new(InMemoryScheduleStore::new()))
    }

    fn time(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    fn monday(open: u32, close: u32) -> CreateScheduleRuleRequest {
        CreateScheduleRuleRequest {
            resource_id: None,
            day_of_week: 1,
            open_time: time(open),
            close_time: time(close),
        }
    }

    #[tokio::test]
    async fn overlapping_rules_are_rejected() {
        let service = service();
        service.create_rule(monday(9, 12)).await.unwrap();

        assert_matches!(
            service.create_rule(monday(11, 14)).await,
            Err(ScheduleError::OverlappingRule)
        );
        assert!(service.create_rule(monday(12, 15)).await.is_ok());
    }

    #[tokio::test]
    async fn inverted_window_is_rejected() {
        assert_matches!(
            service().create_rule(monday(12, 9)).await,
            Err(ScheduleError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn invalid_day_is_rejected() {
        let mut request = monday(9, 12);
        request.day_of_week = 7;

        assert_matches!(
            service().create_rule(request).await,
            Err(ScheduleError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn rule_for_unknown_resource_is_rejected() {
        let mut request = monday(9, 12);
        request.resource_id = Some(Uuid::new_v4());

        assert_matches!(
            service().create_rule(request).await,
            Err(ScheduleError::ResourceNotFound)
        );
    }

    #[tokio::test]
    async fn deactivated_rule_can_be_shadowed() {
        let service = service();
        let rule = service.create_rule(monday(9, 12)).await.unwrap();
        service
            .update_rule(
                rule.id,
                UpdateScheduleRuleRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(service.create_rule(monday(10, 11)).await.is_ok());
    }

    #[tokio::test]
    async fn resources_are_trimmed_and_listed() {
        let service = service();
        service
            .create_resource(CreateResourceRequest {
                name: "  Chair 2 ".to_string(),
                kind: ResourceKind::Chair,
            })
            .await
            .unwrap();

        let resources = service.list_resources(true).await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "Chair 2");
    }

    #[tokio::test]
    async fn deleting_missing_blackout_reports_not_found() {
        assert_matches!(
            service().delete_blackout(Uuid::new_v4()).await,
            Err(ScheduleError::BlackoutNotFound)
        );
    }
}
