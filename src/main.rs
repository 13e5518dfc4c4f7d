//! ETEA · Question Bank Backend
//!
//! - Axum HTTP API (question bank, import, generation) + practice WebSocket
//! - Optional OpenAI-compatible generation (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3001)
//!   DB_PATH           : JSON store file (default ./data/db.json)
//!   OPENAI_API_KEY    : enables question generation if present
//!   OPENAI_BASE_URL   : default "https://api.openai.com/v1"
//!   OPENAI_MODEL      : default "gpt-4o-mini"
//!   ETEA_CONFIG_PATH  : path to TOML config (prompts + generation limits)
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use etea_backend::config::Settings;
use etea_backend::telemetry;
use etea_backend::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let settings = Settings::from_env();

  // Open the store and build the generation adapter.
  let state = Arc::new(AppState::from_settings(&settings).await?);

  let app = build_router(state);

  let listener = TcpListener::bind(settings.addr).await?;
  info!(target: "etea_backend", addr = %settings.addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "etea_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "etea_backend", error = %e, "Failed to listen for Ctrl-C; shutting down");
  }
  info!(target: "etea_backend", "Shutdown signal received");
}
