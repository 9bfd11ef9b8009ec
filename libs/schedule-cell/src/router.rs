use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_store::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn schedule_routes(state: AppState) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::list_templates))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_templates));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/", post(handlers::create_template))
        .route("/{template_id}", put(handlers::update_template))
        .route("/{template_id}", delete(handlers::delete_template))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
