mod handlers;
mod state;

pub use handlers::{ApiError, ForecastQuery};
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::pipeline::Session;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/cities", get(handlers::city_list))
        .route("/api/resolve", get(handlers::resolve))
        .route("/api/forecast", get(handlers::forecast))
        .route("/api/forecast.csv", get(handlers::forecast_csv))
        .route("/api/insights", get(handlers::insights))
        .route("/api/map", get(handlers::map))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until the process is stopped. One session, and so one set
/// of memo tables, backs every request.
pub async fn start(host: &str, port: u16, settings: Settings) -> std::io::Result<()> {
    let session = Session::from_settings(&settings);
    let app = build_router(Arc::new(AppState::new(settings, session)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, "vaerprognose server listening");
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app).await
}
