use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::error;

use admin_cell::services::AdminPanelService;
use admin_cell::{admin_routes, AdminState};
use appointment_cell::services::AppointmentBookingService;
use appointment_cell::{appointment_routes, BookingState};
use schedule_cell::{schedule_routes, ScheduleState};
use shared_config::AppConfig;

use crate::state::Services;

struct RootState {
    config: Arc<AppConfig>,
    booking: Arc<AppointmentBookingService>,
}

pub fn create_router(services: &Services) -> Router {
    let root_state = Arc::new(RootState {
        config: services.config.clone(),
        booking: services.booking.clone(),
    });

    let booking_state = Arc::new(BookingState {
        booking: services.booking.clone(),
    });

    let schedule_state = Arc::new(ScheduleState {
        availability: services.availability.clone(),
        rules: services.rules.clone(),
    });

    let admin_state = Arc::new(AdminState {
        config: services.config.clone(),
        panel: Arc::new(AdminPanelService::new(
            services.booking.clone(),
            services.rules.clone(),
        )),
    });

    Router::new()
        .route("/", get(|| async { "Dental Clinic booking API is running!" }))
        .route("/health", get(health_check))
        .route("/clinic", get(clinic_info))
        .with_state(root_state)
        .nest("/appointments", appointment_routes(booking_state))
        .merge(schedule_routes(schedule_state))
        .nest("/admin", admin_routes(admin_state))
}

async fn health_check(State(state): State<Arc<RootState>>) -> (StatusCode, Json<Value>) {
    match state.booking.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

/// Location for the map widget on the public site.
async fn clinic_info(State(state): State<Arc<RootState>>) -> Json<Value> {
    let clinic = &state.config.clinic;

    Json(json!({
        "name": clinic.name,
        "address": clinic.address,
        "latitude": clinic.latitude,
        "longitude": clinic.longitude
    }))
}
