use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BlackoutDate, Resource, ScheduleError, ScheduleRule};

use super::ScheduleStore;

/// Schedule tables behind Supabase's PostgREST API.
pub struct SupabaseScheduleStore {
    supabase: SupabaseClient,
    auth_token: Option<String>,
}

impl SupabaseScheduleStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: config.service_token().map(str::to_string),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ScheduleError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, self.auth_token.as_deref(), None)
            .await?;

        Ok(rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?)
    }

    /// Writes with `return=representation` and hands back the rows PostgREST echoed.
    async fn write(&self, method: Method, path: &str, body: Option<Value>) -> Result<Vec<Value>, ScheduleError> {
        Ok(self
            .supabase
            .request_with_headers(
                method,
                path,
                self.auth_token.as_deref(),
                body,
                Some(SupabaseClient::representation_headers()),
            )
            .await?)
    }

    fn first_row<T: DeserializeOwned>(rows: Vec<Value>, missing: ScheduleError) -> Result<T, ScheduleError> {
        let row = rows.into_iter().next().ok_or(missing)?;
        Ok(serde_json::from_value(row)?)
    }
}

#[async_trait]
impl ScheduleStore for SupabaseScheduleStore {
    async fn list_resources(&self) -> Result<Vec<Resource>, ScheduleError> {
        self.fetch("/rest/v1/resources?order=name.asc").await
    }

    async fn insert_resource(&self, resource: Resource) -> Result<Resource, ScheduleError> {
        debug!("Creating resource {}", resource.name);
        let rows = self
            .write(Method::POST, "/rest/v1/resources", Some(json!(resource)))
            .await?;
        Self::first_row(rows, ScheduleError::DatabaseError("Failed to create resource".to_string()))
    }

    async fn list_rules(&self) -> Result<Vec<ScheduleRule>, ScheduleError> {
        self.fetch("/rest/v1/schedule_rules?order=day_of_week.asc,open_time.asc")
            .await
    }

    async fn get_rule(&self, rule_id: Uuid) -> Result<ScheduleRule, ScheduleError> {
        let path = format!("/rest/v1/schedule_rules?id=eq.{}", rule_id);
        self.fetch(&path)
            .await?
            .into_iter()
            .next()
            .ok_or(ScheduleError::RuleNotFound)
    }

    async fn insert_rule(&self, rule: ScheduleRule) -> Result<ScheduleRule, ScheduleError> {
        debug!("Creating schedule rule for day {}", rule.day_of_week);
        let rows = self
            .write(Method::POST, "/rest/v1/schedule_rules", Some(json!(rule)))
            .await?;
        Self::first_row(rows, ScheduleError::DatabaseError("Failed to create schedule rule".to_string()))
    }

    async fn update_rule(&self, rule: ScheduleRule) -> Result<ScheduleRule, ScheduleError> {
        debug!("Updating schedule rule {}", rule.id);
        let path = format!("/rest/v1/schedule_rules?id=eq.{}", rule.id);
        let body = json!({
            "open_time": rule.open_time,
            "close_time": rule.close_time,
            "is_active": rule.is_active,
            "updated_at": rule.updated_at,
        });
        let rows = self.write(Method::PATCH, &path, Some(body)).await?;
        Self::first_row(rows, ScheduleError::RuleNotFound)
    }

    async fn delete_rule(&self, rule_id: Uuid) -> Result<(), ScheduleError> {
        let path = format!("/rest/v1/schedule_rules?id=eq.{}", rule_id);
        let rows = self.write(Method::DELETE, &path, None).await?;
        if rows.is_empty() {
            return Err(ScheduleError::RuleNotFound);
        }
        Ok(())
    }

    async fn list_blackouts(&self) -> Result<Vec<BlackoutDate>, ScheduleError> {
        self.fetch("/rest/v1/blackout_dates?order=date.asc").await
    }

    async fn insert_blackout(&self, blackout: BlackoutDate) -> Result<BlackoutDate, ScheduleError> {
        debug!("Creating blackout date {}", blackout.date);
        let rows = self
            .write(Method::POST, "/rest/v1/blackout_dates", Some(json!(blackout)))
            .await?;
        Self::first_row(rows, ScheduleError::DatabaseError("Failed to create blackout date".to_string()))
    }

    async fn delete_blackout(&self, blackout_id: Uuid) -> Result<(), ScheduleError> {
        let path = format!("/rest/v1/blackout_dates?id=eq.{}", blackout_id);
        let rows = self.write(Method::DELETE, &path, None).await?;
        if rows.is_empty() {
            return Err(ScheduleError::BlackoutNotFound);
        }
        Ok(())
    }
}
