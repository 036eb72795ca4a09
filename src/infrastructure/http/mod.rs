use axum::{middleware, response::Json, Router};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    domain::providers::{NoSessionProvider, SessionProvider},
    infrastructure::{
        config::{AppConfig, ConfigError},
        session::JwtSessionProvider,
    },
    presentation::{
        middleware::{edge_middleware, EdgePipeline, TracingLogSink},
        routes,
    },
};

/// Build the edge pipeline with the configured session provider
pub fn build_pipeline(config: &AppConfig) -> Result<EdgePipeline, ConfigError> {
    let sessions: Arc<dyn SessionProvider> = match &config.session.jwt_secret {
        Some(secret) => {
            Arc::new(JwtSessionProvider::new(secret, config.session.cookie_name.clone()))
        }
        None => {
            info!("No session secret configured, request logs will be anonymous");
            Arc::new(NoSessionProvider)
        }
    };

    EdgePipeline::from_config(config, sessions, Arc::new(TracingLogSink))
}

/// Create the main application router
pub fn create_app(pipeline: EdgePipeline) -> Router {
    let middleware_stack =
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CompressionLayer::new());

    routes::create_routes()
        .layer(middleware::from_fn_with_state(pipeline, edge_middleware))
        .layer(middleware_stack)
}

/// Liveness probe
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "edge-gateway"
    }))
}

/// Start the HTTP server
///
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start
pub async fn start_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(&config)?;
    let sweeper = pipeline.limiter().spawn_sweeper();

    let app = create_app(pipeline);
    let addr = config.server.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let result =
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;

    sweeper.abort();
    result?;

    Ok(())
}
