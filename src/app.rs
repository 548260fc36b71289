use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{analysis, dashboard, events, health};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let api = Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/events", events::router())
        .nest("/dashboard", dashboard::router())
        .merge(analysis::router())
        .merge(dashboard::reload_router());

    Router::<AppState>::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
