// libs/schedule-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{AvailabilityQuery, AvailabilityResponse, DateRange};
use crate::router::ScheduleState;

/// Open slots for one resource. `to` defaults to `from`, so a bare `from`
/// asks for a single day.
#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<ScheduleState>>,
    Path(resource_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let range = DateRange::new(query.from, query.to.unwrap_or(query.from));

    let open_slots = state
        .availability
        .list_open_slots(resource_id, range, query.duration_minutes)
        .await?;

    let slots: Vec<_> = open_slots.iter().collect();
    debug!("Resource {} has {} open slots in {:?}", resource_id, slots.len(), range);

    Ok(Json(AvailabilityResponse {
        resource_id,
        from: range.from,
        to: range.to,
        duration_minutes: open_slots.duration_minutes(),
        total: slots.len(),
        slots,
    }))
}

#[axum::debug_handler]
pub async fn list_resources(
    State(state): State<Arc<ScheduleState>>,
) -> Result<Json<Value>, AppError> {
    let resources = state.rules.list_resources(true).await?;

    Ok(Json(json!({
        "resources": resources,
        "total": resources.len()
    })))
}
