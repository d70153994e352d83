// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{BookAppointmentRequest, CancelAppointmentRequest, CancellationActor};
use crate::router::BookingState;

// ==============================================================================
// PUBLIC BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<BookingState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = state.booking.book_appointment(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": format!(
                "Appointment registered for {}. Status: {}",
                appointment.patient_name, appointment.status
            )
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<BookingState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_appointment(appointment_id).await?;

    Ok(Json(json!({ "appointment": appointment })))
}

/// Patient-initiated cancellation, authorized by the phone on the booking.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<BookingState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let phone = request
        .patient_phone
        .filter(|phone| !phone.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("patient_phone is required to cancel".to_string()))?;

    let appointment = state
        .booking
        .cancel_appointment(appointment_id, CancellationActor::Patient { phone }, request.reason)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}
