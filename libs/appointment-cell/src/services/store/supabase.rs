use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, Url};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use schedule_cell::models::TimeSlot;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentOrder, AppointmentStats, AppointmentStatus,
};

use super::AppointmentStore;

const TABLE: &str = "/rest/v1/appointments";

/// Appointments behind Supabase's PostgREST API. Overlap protection across
/// service instances comes from the table's exclusion constraint, which
/// PostgREST reports as `409 Conflict`.
pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
    auth_token: Option<String>,
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Table path with a percent-encoded PostgREST query string.
fn query_path(pairs: &[(&str, String)]) -> Result<String, AppointmentError> {
    let url = Url::parse_with_params(&format!("http://postgrest{}", TABLE), pairs)
        .map_err(|e| AppointmentError::DatabaseError(format!("Invalid query: {}", e)))?;
    Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: config.service_token().map(str::to_string),
        }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, self.auth_token.as_deref(), None)
            .await?;

        Ok(rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()?)
    }

    async fn write(&self, method: Method, path: &str, body: Option<Value>) -> Result<Vec<Value>, AppointmentError> {
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

    async fn count_where(&self, filters: &[(&str, String)]) -> Result<usize, AppointmentError> {
        let mut query = vec![("select", "id".to_string())];
        query.extend(filters.iter().map(|(key, value)| (*key, value.clone())));

        let path = query_path(&query)?;
        Ok(self.supabase.count(&path, self.auth_token.as_deref()).await?)
    }

    async fn count_status(&self, status: AppointmentStatus) -> Result<usize, AppointmentError> {
        self.count_where(&[("status", format!("eq.{}", status))]).await
    }

    /// A guarded PATCH matched nothing: tell a missing row apart from a row
    /// that moved on to another status.
    async fn explain_missed_update(&self, appointment_id: Uuid) -> AppointmentError {
        match self.get(appointment_id).await {
            Ok(current) => AppointmentError::InvalidStatusTransition(current.status),
            Err(error) => error,
        }
    }

    fn list_path(filter: &AppointmentFilter) -> Result<String, AppointmentError> {
        let mut query = vec![("select", "*".to_string())];

        if let Some(resource_id) = filter.resource_id {
            query.push(("resource_id", format!("eq.{}", resource_id)));
        }
        if let Some(status) = filter.status {
            query.push(("status", format!("eq.{}", status)));
        }
        if let Some(from) = filter.from {
            query.push(("start_time", format!("gte.{}", timestamp(from))));
        }
        if let Some(to) = filter.to {
            query.push(("start_time", format!("lt.{}", timestamp(to))));
        }
        if let Some(name) = filter.patient_name.as_deref() {
            query.push(("patient_name", format!("ilike.*{}*", name)));
        }

        query.push(match filter.order {
            AppointmentOrder::StartAsc => ("order", "start_time.asc".to_string()),
            AppointmentOrder::CreatedDesc => ("order", "created_at.desc".to_string()),
        });

        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = filter.offset {
            query.push(("offset", offset.to_string()));
        }

        query_path(&query)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        debug!("Inserting appointment {} on resource {}", appointment.id, appointment.resource_id);

        let rows = self.write(Method::POST, TABLE, Some(json!(appointment))).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create appointment".to_string()))?;
        Ok(serde_json::from_value(row)?)
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?id=eq.{}", TABLE, appointment_id);
        self.fetch(&path)
            .await?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        self.fetch(&Self::list_path(filter)?).await
    }

    async fn active_in_range(
        &self,
        resource_id: Uuid,
        window: TimeSlot,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = query_path(&[
            ("resource_id", format!("eq.{}", resource_id)),
            ("status", "neq.cancelled".to_string()),
            ("start_time", format!("lt.{}", timestamp(window.end_time))),
            ("end_time", format!("gt.{}", timestamp(window.start_time))),
            ("order", "start_time.asc".to_string()),
        ])?;
        self.fetch(&path).await
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment {} from {} to {}", appointment_id, expected, new_status);

        let path = format!("{}?id=eq.{}&status=eq.{}", TABLE, appointment_id, expected);
        let body = json!({
            "status": new_status,
            "updated_at": Utc::now(),
        });

        match self.write(Method::PATCH, &path, Some(body)).await?.into_iter().next() {
            Some(row) => Ok(serde_json::from_value(row)?),
            None => Err(self.explain_missed_update(appointment_id).await),
        }
    }

    async fn reschedule(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        slot: TimeSlot,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Rescheduling appointment {} to {}", appointment_id, slot);

        let path = format!("{}?id=eq.{}&status=eq.{}", TABLE, appointment_id, expected);
        let body = json!({
            "start_time": slot.start_time,
            "end_time": slot.end_time,
            "updated_at": Utc::now(),
        });

        match self.write(Method::PATCH, &path, Some(body)).await?.into_iter().next() {
            Some(row) => Ok(serde_json::from_value(row)?),
            None => Err(self.explain_missed_update(appointment_id).await),
        }
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let path = format!("{}?id=eq.{}", TABLE, appointment_id);
        if self.write(Method::DELETE, &path, None).await?.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(())
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<AppointmentStats, AppointmentError> {
        let expired_filters = [
            ("status", format!("eq.{}", AppointmentStatus::Confirmed)),
            ("end_time", format!("lte.{}", timestamp(now))),
        ];
        let (requested, confirmed, attended, cancelled, expired) = futures::try_join!(
            self.count_status(AppointmentStatus::Requested),
            self.count_status(AppointmentStatus::Confirmed),
            self.count_status(AppointmentStatus::Attended),
            self.count_status(AppointmentStatus::Cancelled),
            self.count_where(&expired_filters),
        )?;

        Ok(AppointmentStats {
            total: requested + confirmed + attended + cancelled,
            requested,
            confirmed,
            attended,
            cancelled,
            expired,
        })
    }

    async fn ping(&self) -> Result<(), AppointmentError> {
        let path = format!("{}?select=id&limit=1", TABLE);
        let _: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, self.auth_token.as_deref(), None)
            .await?;
        Ok(())
    }
}
