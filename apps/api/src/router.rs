use axum::{routing::get, Router};

use booking_cell::router::booking_routes;
use schedule_cell::router::schedule_routes;
use shared_store::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Booking API is running!" }))
        .nest("/timeslots", schedule_routes(state.clone()))
        .nest("/appointments", booking_routes(state.clone()))
}
