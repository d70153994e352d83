// libs/admin-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use appointment_cell::models::{BookAppointmentRequest, RescheduleAppointmentRequest};
use schedule_cell::models::{
    CreateBlackoutRequest, CreateResourceRequest, CreateScheduleRuleRequest, UpdateScheduleRuleRequest,
};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{AdminAction, AppointmentQueryParams, RecentQuery};
use crate::router::AdminState;

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Query(params): Query<AppointmentQueryParams>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointments = state.panel.list_appointments(params).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn recent_appointments(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointments = state.panel.recent_appointments(query.limit).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn appointment_stats(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let stats = state.panel.stats().await?;
    Ok(Json(json!({ "stats": stats })))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;

    let appointment = state.panel.create_appointment(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn apply_action(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(action): Json<AdminAction>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let result = state.panel.apply_action(appointment_id, action).await?;
    Ok(Json(json!(result)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointment = state
        .panel
        .reschedule_appointment(appointment_id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    state.panel.delete_appointment(appointment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// SCHEDULE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_rules(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let rules = state.panel.rules().list_rules().await?;
    Ok(Json(json!({ "rules": rules })))
}

#[axum::debug_handler]
pub async fn create_rule(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateScheduleRuleRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;

    let rule = state.panel.rules().create_rule(request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "rule": rule }))))
}

#[axum::debug_handler]
pub async fn update_rule(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Path(rule_id): Path<Uuid>,
    Json(request): Json<UpdateScheduleRuleRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let rule = state.panel.rules().update_rule(rule_id, request).await?;
    Ok(Json(json!({ "rule": rule })))
}

#[axum::debug_handler]
pub async fn delete_rule(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Path(rule_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    state.panel.rules().delete_rule(rule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_blackouts(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let blackouts = state.panel.rules().list_blackouts().await?;
    Ok(Json(json!({ "blackouts": blackouts })))
}

#[axum::debug_handler]
pub async fn create_blackout(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBlackoutRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;

    let blackout = state.panel.rules().create_blackout(request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "blackout": blackout }))))
}

#[axum::debug_handler]
pub async fn delete_blackout(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Path(blackout_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    state.panel.rules().delete_blackout(blackout_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_resources(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let resources = state.panel.rules().list_resources(false).await?;
    Ok(Json(json!({ "resources": resources })))
}

#[axum::debug_handler]
pub async fn create_resource(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;

    let resource = state.panel.rules().create_resource(request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "resource": resource }))))
}
