mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::db::Database;
use middleware::{auth_middleware, SecurityConfig};
use pulse_core::{Calendar, Clock};

/// Shared handler state: storage, the source of "now", and the day boundary.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub clock: Arc<dyn Clock>,
    pub calendar: Calendar,
}

impl AppState {
    pub fn new(db: Database, clock: Arc<dyn Clock>, calendar: Calendar) -> Self {
        Self {
            db,
            clock,
            calendar,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    create_router_with_security(state, SecurityConfig::disabled())
}

pub fn create_router_with_security(state: AppState, security: SecurityConfig) -> Router {
    let cors = security.cors_layer();

    let api = Router::new()
        // Tasks
        .route("/tasks", get(handlers::list_tasks).post(handlers::create_task))
        .route(
            "/tasks/{id}",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/tasks/{id}/toggle", patch(handlers::toggle_task))
        // Habits
        .route("/habits", get(handlers::list_habits).post(handlers::create_habit))
        .route(
            "/habits/{id}",
            put(handlers::update_habit).delete(handlers::delete_habit),
        )
        .route(
            "/habits/{id}/toggle",
            post(handlers::toggle_habit).patch(handlers::toggle_habit),
        )
        // Reviews
        .route("/reviews", get(handlers::list_reviews))
        .route("/reviews/end-day", post(handlers::end_day))
        .route("/reviews/heatmap", get(handlers::get_heatmap))
        .route_layer(from_fn_with_state(security, auth_middleware))
        // Health stays reachable without a key
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
