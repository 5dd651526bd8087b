// Define data modules
pub mod config;      // Environment-based server settings
pub mod error;       // Validation and HTTP error types
pub mod ics;         // Calendar (.ics) export
pub mod logic;       // Core interval-packing scheduler
pub mod models;      // Data structures (tasks, appointments, blocks, settings)
pub mod routes_plan; // HTTP handlers for scheduling / plan APIs
pub mod routes_tasks; // HTTP handlers for task, appointment & settings APIs
pub mod store;       // Persistent storage (load/save db.json)
pub mod validate;    // Strict payload validation

use std::path::Path;
use std::sync::Arc;

// Import axum routing utilities and Router
use axum::{
    Router,
    routing::{get, post, put},
};
use tokio::sync::Mutex;
use tower_http::services::ServeDir; // Used to serve static files (HTML/CSS/JS)

use crate::store::Store;

// Shared handler state.
// The mutex serializes load-modify-save cycles on the JSON file.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<Store>>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // scheduling
        .route("/schedule", post(routes_plan::post_schedule))
        .route("/schedule/validate", post(routes_plan::validate_schedule))
        .route("/plan", get(routes_plan::get_plan))
        .route("/plan.ics", get(routes_plan::get_plan_ics))
        // tasks
        .route("/tasks", get(routes_tasks::get_tasks).post(routes_tasks::create_task))
        .route(
            "/tasks/:id",
            put(routes_tasks::update_task).delete(routes_tasks::delete_task),
        )
        // appointments
        .route(
            "/appointments",
            get(routes_tasks::get_appointments).post(routes_tasks::create_appointment),
        )
        .route(
            "/appointments/:id",
            put(routes_tasks::update_appointment).delete(routes_tasks::delete_appointment),
        )
        // settings
        .route(
            "/settings",
            get(routes_tasks::get_settings).put(routes_tasks::put_settings),
        )
        .with_state(state)
}

pub fn app(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .nest("/api", api_router(state))
        .fallback_service(ServeDir::new(static_dir))
}
