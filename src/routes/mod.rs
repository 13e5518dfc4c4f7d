//! Router assembly. API routes live under `/api`, practice sessions on `/ws`, and
//! anything else is served from `./static` (index.html for unknown paths).

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Routes plus the shared middleware stack (request spans, permissive CORS).
/// The bank write endpoints carry no authentication.
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    let api = Router::new()
        .route("/health", get(http::http_health))
        .route("/subjects", get(http::http_subjects))
        .route("/samples", get(http::http_samples))
        .route("/mcqs", get(http::http_list_mcqs))
        .route("/mcqs/add-single", post(http::http_add_single))
        .route("/mcqs/add-bulk", post(http::http_add_bulk))
        .route("/mcqs/import", post(http::http_import))
        .route("/generate", post(http::http_generate));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .nest("/api", api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CorsLayer::permissive()),
        )
        .fallback_service(static_service)
}
