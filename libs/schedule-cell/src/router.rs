// libs/schedule-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::services::{AvailabilityService, ScheduleRuleService};

pub struct ScheduleState {
    pub availability: Arc<AvailabilityService>,
    pub rules: Arc<ScheduleRuleService>,
}

/// Public, read-only calendar routes. Edits go through the admin routes.
pub fn schedule_routes(state: Arc<ScheduleState>) -> Router {
    Router::new()
        .route("/availability/{resource_id}", get(handlers::get_availability))
        .route("/resources", get(handlers::list_resources))
        .with_state(state)
}
