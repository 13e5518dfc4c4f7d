//! ETEA exam-prep backend: a flat-file MCQ bank with validated ingestion, subject
//! retrieval, model-backed question generation and per-connection practice sessions.

pub mod bank;
pub mod config;
pub mod domain;
pub mod error;
pub mod generation;
pub mod import;
pub mod openai;
pub mod protocol;
pub mod routes;
pub mod seeds;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod util;

pub use routes::build_router;
pub use state::AppState;
