// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::AppointmentBookingService;

pub struct BookingState {
    pub booking: Arc<AppointmentBookingService>,
}

/// Patient-facing booking routes. No login: bookings are identified by id
/// and cancellations by the phone number given when booking.
pub fn appointment_routes(state: Arc<BookingState>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .with_state(state)
}
