//! Tracing setup.
//!
//! `LOG_LEVEL` takes an `EnvFilter` directive string, e.g.
//! `"info,bank=debug,generation=debug,session=debug"`. Without it `DEFAULT_FILTER` applies.
//! `LOG_FORMAT` picks the output: `json` (one object per line), `compact`, or the
//! default multi-field text format. Targets, files and lines are always included.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,etea_backend=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Compact,
    Json,
}

impl LogFormat {
    pub fn from_env_value(v: Option<&str>) -> Self {
        match v.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Text,
        }
    }
}

/// Install the global subscriber. Calling it twice keeps the first one.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Each format is a distinct subscriber type.
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(target: "etea_backend", ?format, "Tracing initialized");
    }
}
