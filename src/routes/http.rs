//! HTTP endpoint handlers. These are thin wrappers that forward to the bank and the
//! generation adapter. Each handler is instrumented; failures map through `ApiError`.

use std::sync::Arc;
use axum::{extract::{State, Query}, http::StatusCode, Json, response::{IntoResponse, Response}};
use serde_json::Value;
use tracing::{info, instrument};

use crate::domain::{Difficulty, Mcq, StoredMcq, Subject};
use crate::error::ApiError;
use crate::generation::{GenerateRequest, DEFAULT_COUNT, TOPIC_DEFAULT_COUNT};
use crate::import::{parse_upload, ImportFormat};
use crate::protocol::*;
use crate::seeds::samples_for;
use crate::state::AppState;

const EMPTY_BULK: &str = "Request body must be an array of MCQs and cannot be empty.";

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info")]
pub async fn http_subjects() -> impl IntoResponse {
  let subjects: Vec<SubjectOut> = Subject::ALL
    .iter()
    .map(|s| SubjectOut { id: *s, name: s.display_name() })
    .collect();
  Json(subjects)
}

fn parse_subject(raw: &str) -> Result<Subject, ApiError> {
  Subject::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("Unknown subject '{}'.", raw.trim())))
}

#[instrument(level = "info", fields(subject = ?q.subject))]
pub async fn http_samples(Query(q): Query<SubjectQuery>) -> Result<Json<Vec<QuestionOut>>, ApiError> {
  let subject = match q.subject.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
    Some(raw) => Some(parse_subject(raw)?),
    None => None,
  };
  Ok(Json(samples_for(subject).iter().map(QuestionOut::from).collect()))
}

#[instrument(level = "info", skip(state), fields(subject = ?q.subject))]
pub async fn http_list_mcqs(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SubjectQuery>,
) -> Result<Json<Vec<StoredMcq>>, ApiError> {
  let records = state.bank.list(q.subject.as_deref()).await?;
  info!(target: "bank", count = records.len(), "HTTP mcqs listed");
  Ok(Json(to_stored(&records)))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_add_single(
  State(state): State<Arc<AppState>>,
  Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
  let mcq = state.bank.add_one(&body).await?;
  Ok((
    StatusCode::CREATED,
    Json(McqCreatedOut { message: "MCQ added successfully!".into(), mcq: StoredMcq::from(&mcq) }),
  ))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_add_bulk(
  State(state): State<Arc<AppState>>,
  Json(body): Json<Value>,
) -> Result<Response, ApiError> {
  let items = match body.get("mcqs").and_then(Value::as_array) {
    Some(items) if !items.is_empty() => items,
    _ => return Err(ApiError::BadRequest(EMPTY_BULK.into())),
  };
  ingest_bulk(&state, items).await
}

/// Raw file upload (`?format=csv|json`, JSON by default), ingested like add-bulk.
#[instrument(level = "info", skip(state, body), fields(format = ?q.format, body_len = body.len()))]
pub async fn http_import(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ImportQuery>,
  body: String,
) -> Result<Response, ApiError> {
  let format = match q.format.as_deref() {
    None => ImportFormat::Json,
    Some(f) => ImportFormat::parse(f)
      .ok_or_else(|| ApiError::BadRequest(format!("Unsupported import format '{f}'. Use csv or json.")))?,
  };
  let items = parse_upload(format, &body).map_err(ApiError::BadRequest)?;
  if items.is_empty() {
    return Err(ApiError::BadRequest("The uploaded file contains no MCQs.".into()));
  }
  ingest_bulk(&state, &items).await
}

async fn ingest_bulk(state: &AppState, items: &[Value]) -> Result<Response, ApiError> {
  let outcome = state.bank.add_many(items).await?;
  let added = outcome.added.len();

  if outcome.failures.is_empty() {
    let body = BulkCreatedOut {
      message: format!("Successfully added {added} MCQs."),
      mcqs: to_stored(&outcome.added),
    };
    return Ok((StatusCode::CREATED, Json(body)).into_response());
  }

  let body = BulkPartialOut {
    message: format!("Some MCQs failed validation. {added} MCQs added."),
    added_count: added,
    error_count: outcome.failures.len(),
    errors: outcome.failures.into_iter().map(BulkErrorOut::from).collect(),
    added_mcqs: (added > 0).then(|| to_stored(&outcome.added)),
  };
  Ok((StatusCode::BAD_REQUEST, Json(body)).into_response())
}

/// Shared by `/api/generate` and the practice socket.
///
/// `mixed` spreads the count over all difficulties; a topic without an explicit
/// difficulty is a topic-focused (medium) batch.
pub(crate) async fn run_generation(
  state: &AppState,
  subject: Subject,
  topic: Option<String>,
  difficulty: Option<Difficulty>,
  count: Option<usize>,
  mixed: bool,
) -> Result<Vec<Mcq>, ApiError> {
  let generator = &state.generator;
  let default_count = if topic.is_some() { TOPIC_DEFAULT_COUNT } else { DEFAULT_COUNT };
  let count = count.unwrap_or(default_count.min(generator.max_count()));
  let req = GenerateRequest::new(subject, topic, difficulty.unwrap_or_default(), count, generator.max_count())?;

  let questions = match (&req.topic, difficulty) {
    _ if mixed => generator.generate_mixed(req.subject, req.count).await?,
    (Some(topic), None) => generator.generate_topic(req.subject, topic, Some(req.count)).await?,
    _ => generator.generate(&req).await?,
  };
  Ok(questions)
}

#[instrument(level = "info", skip(state, body), fields(subject = %body.subject, count = ?body.count, mixed = body.mixed))]
pub async fn http_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Result<Json<QuestionsOut>, ApiError> {
  let subject = parse_subject(&body.subject)?;
  let difficulty = match body.difficulty.as_deref() {
    None => None,
    Some(d) => Some(Difficulty::parse(d).ok_or_else(|| {
      ApiError::BadRequest(format!("Unknown difficulty '{d}'. Use easy, medium or hard."))
    })?),
  };
  let questions = run_generation(&state, subject, body.topic, difficulty, body.count, body.mixed).await?;
  info!(target: "generation", %subject, count = questions.len(), "HTTP generate served");
  Ok(Json(QuestionsOut { questions: questions.iter().map(QuestionOut::from).collect() }))
}
