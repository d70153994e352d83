// libs/admin-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::AdminPanelService;

pub struct AdminState {
    pub config: Arc<AppConfig>,
    pub panel: Arc<AdminPanelService>,
}

pub fn admin_routes(state: Arc<AdminState>) -> Router {
    // Every admin operation requires a valid token with the admin role
    Router::new()
        .route(
            "/appointments",
            get(handlers::list_appointments).post(handlers::create_appointment),
        )
        .route("/appointments/recent", get(handlers::recent_appointments))
        .route("/appointments/stats", get(handlers::appointment_stats))
        .route("/appointments/{appointment_id}", delete(handlers::delete_appointment))
        .route("/appointments/{appointment_id}/actions", post(handlers::apply_action))
        .route(
            "/appointments/{appointment_id}/reschedule",
            patch(handlers::reschedule_appointment),
        )
        .route(
            "/schedule/rules",
            get(handlers::list_rules).post(handlers::create_rule),
        )
        .route(
            "/schedule/rules/{rule_id}",
            put(handlers::update_rule).delete(handlers::delete_rule),
        )
        .route(
            "/schedule/blackouts",
            get(handlers::list_blackouts).post(handlers::create_blackout),
        )
        .route(
            "/schedule/blackouts/{blackout_id}",
            delete(handlers::delete_blackout),
        )
        .route(
            "/resources",
            get(handlers::list_resources).post(handlers::create_resource),
        )
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
