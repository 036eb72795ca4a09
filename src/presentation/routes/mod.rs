use axum::{routing::get, Router};

use crate::{infrastructure::http::health_check, presentation::handlers::pages};

/// Create all application routes
pub fn create_routes() -> Router {
    Router::new().nest("/api", api_routes()).merge(page_routes())
}

fn api_routes() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Localized pages; unprefixed paths never get here, the edge pipeline
/// redirects them first
fn page_routes() -> Router {
    Router::new()
        .route("/{locale}", get(pages::render_page))
        .route("/{locale}/{*rest}", get(pages::render_page))
        .fallback(pages::page_not_found)
}
