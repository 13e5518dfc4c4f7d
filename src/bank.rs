//! Question bank: ingestion (single + bulk) and retrieval over the flat-file store.
//!
//! Candidates arrive as raw JSON values. Validation is done field by field so a
//! wrongly-typed field is reported against that field instead of failing the whole
//! request body.

use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{Difficulty, Mcq, NO_EXPLANATION};
use crate::error::{IngestError, StoreError, ValidationError};
use crate::store::McqStore;

/// A validated candidate, not yet assigned identity or timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMcq {
  pub question: String,
  pub options: [String; 4],
  pub correct: usize,
  pub subject: String,
  pub topic: String,
  pub difficulty: Difficulty,
  pub explanation: String,
}

impl NewMcq {
  fn into_record(self) -> Mcq {
    Mcq {
      id: Uuid::new_v4().to_string(),
      question: self.question,
      options: self.options,
      correct: self.correct,
      subject: self.subject,
      topic: self.topic,
      difficulty: self.difficulty,
      explanation: self.explanation,
      created_at: Some(Utc::now()),
    }
  }
}

/// One rejected element of a bulk request. `input` is the candidate exactly as received.
#[derive(Debug, Clone)]
pub struct BulkFailure {
  pub index: usize,
  pub error: ValidationError,
  pub input: Value,
}

#[derive(Debug, Default)]
pub struct BulkOutcome {
  pub added: Vec<Mcq>,
  pub failures: Vec<BulkFailure>,
}

fn required_text(v: &Value, field: &'static str) -> Result<String, ValidationError> {
  match v.get(field) {
    None | Some(Value::Null) => Err(ValidationError::new(field, "Missing required field.")),
    Some(Value::String(s)) if s.trim().is_empty() => {
      Err(ValidationError::new(field, "Must not be empty."))
    }
    Some(Value::String(s)) => Ok(s.clone()),
    Some(_) => Err(ValidationError::new(field, "Must be a string.")),
  }
}

fn optional_text(v: &Value, field: &str) -> Option<String> {
  v.get(field)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

fn options_of(v: &Value) -> Result<[String; 4], ValidationError> {
  const MSG: &str = "Options must be an array of 4 strings.";
  let arr = match v.get("options") {
    None | Some(Value::Null) => return Err(ValidationError::new("options", "Missing required field.")),
    Some(Value::Array(a)) => a,
    Some(_) => return Err(ValidationError::new("options", MSG)),
  };
  if arr.len() != 4 {
    return Err(ValidationError::new("options", MSG));
  }

  let mut out: Vec<String> = Vec::with_capacity(4);
  for item in arr {
    let Some(s) = item.as_str() else {
      return Err(ValidationError::new("options", MSG));
    };
    if s.trim().is_empty() {
      return Err(ValidationError::new("options", "Options must not be empty."));
    }
    if out.iter().any(|o| o == s) {
      return Err(ValidationError::new("options", "Options must be distinct."));
    }
    out.push(s.to_string());
  }
  out.try_into().map_err(|_| ValidationError::new("options", MSG))
}

/// Validate one raw candidate `{question, options[4], correctAnswer, subject}` plus the
/// optional `topic`, `difficulty`, `explanation`.
pub fn validate(v: &Value) -> Result<NewMcq, ValidationError> {
  if !v.is_object() {
    return Err(ValidationError::new("mcq", "Each MCQ must be a JSON object."));
  }

  let question = required_text(v, "question")?;
  let options = options_of(v)?;
  let correct_answer = required_text(v, "correctAnswer")?;
  let correct = options
    .iter()
    .position(|o| *o == correct_answer)
    .ok_or_else(|| ValidationError::new("correctAnswer", "Correct answer must be one of the provided options."))?;
  let subject = required_text(v, "subject")?;

  let difficulty = match v.get("difficulty").and_then(Value::as_str) {
    None => Difficulty::default(),
    Some(d) => Difficulty::parse(d)
      .ok_or_else(|| ValidationError::new("difficulty", "Difficulty must be one of easy, medium, hard."))?,
  };

  Ok(NewMcq {
    question,
    options,
    correct,
    topic: optional_text(v, "topic").unwrap_or_else(|| subject.clone()),
    subject,
    difficulty,
    explanation: optional_text(v, "explanation").unwrap_or_else(|| NO_EXPLANATION.to_string()),
  })
}

pub struct QuestionBank {
  store: McqStore,
}

impl QuestionBank {
  pub fn new(store: McqStore) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &McqStore {
    &self.store
  }

  /// Validate and persist one candidate. On validation failure the store is untouched.
  #[instrument(level = "info", skip(self, candidate))]
  pub async fn add_one(&self, candidate: &Value) -> Result<Mcq, IngestError> {
    let new = validate(candidate).inspect_err(|e| {
      warn!(target: "bank", field = e.field, message = %e.message, "Rejected MCQ");
    })?;
    let record = new.into_record();
    let stored = self
      .store
      .append(|_| (vec![record.clone()], record))
      .await?;
    info!(target: "bank", id = %stored.id, subject = %stored.subject, "MCQ added");
    Ok(stored)
  }

  /// Validate every candidate independently, persist the valid ones in one write.
  #[instrument(level = "info", skip(self, candidates), fields(count = candidates.len()))]
  pub async fn add_many(&self, candidates: &[Value]) -> Result<BulkOutcome, StoreError> {
    let mut outcome = BulkOutcome::default();
    for (index, c) in candidates.iter().enumerate() {
      match validate(c) {
        Ok(n) => outcome.added.push(n.into_record()),
        Err(error) => outcome.failures.push(BulkFailure { index, error, input: c.clone() }),
      }
    }

    if !outcome.added.is_empty() {
      let added = &outcome.added;
      self.store.append(|_| (added.clone(), ())).await?;
    }

    info!(target: "bank", added = outcome.added.len(), rejected = outcome.failures.len(), "Bulk ingestion processed");
    Ok(outcome)
  }

  /// All records, or those whose subject equals `subject` ignoring case.
  #[instrument(level = "debug", skip(self))]
  pub async fn list(&self, subject: Option<&str>) -> Result<Vec<Mcq>, StoreError> {
    let records = self.store.load().await?;
    let filter = subject.map(str::trim).filter(|s| !s.is_empty());
    Ok(match filter {
      None => records,
      Some(s) => {
        let s = s.to_lowercase();
        records.into_iter().filter(|m| m.subject.to_lowercase() == s).collect()
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  async fn bank() -> (tempfile::TempDir, QuestionBank) {
    let dir = tempfile::tempdir().unwrap();
    let store = McqStore::open(dir.path().join("db.json")).await.unwrap();
    (dir, QuestionBank::new(store))
  }

  fn candidate(q: &str, subject: &str) -> Value {
    json!({
      "question": q,
      "options": ["Nucleus", "Mitochondria", "Ribosome", "Golgi"],
      "correctAnswer": "Mitochondria",
      "subject": subject,
    })
  }

  #[test]
  fn validate_reports_first_bad_field() {
    let e = validate(&json!({ "options": ["a", "b", "c", "d"] })).unwrap_err();
    assert_eq!(e.field, "question");

    let e = validate(&json!({ "question": "q", "options": ["a", "b", "c"], "correctAnswer": "a", "subject": "s" })).unwrap_err();
    assert_eq!(e.field, "options");

    let e = validate(&json!({ "question": "q", "options": "abcd", "correctAnswer": "a", "subject": "s" })).unwrap_err();
    assert_eq!(e.field, "options");

    let e = validate(&json!({ "question": "q", "options": ["a", "a", "c", "d"], "correctAnswer": "a", "subject": "s" })).unwrap_err();
    assert_eq!(e.message, "Options must be distinct.");

    let e = validate(&json!({ "question": "q", "options": ["a", "b", "c", "d"], "correctAnswer": "e", "subject": "s" })).unwrap_err();
    assert_eq!(e.field, "correctAnswer");

    let e = validate(&json!({ "question": "q", "options": ["a", "b", "c", "d"], "correctAnswer": "a" })).unwrap_err();
    assert_eq!(e.field, "subject");

    let e = validate(&json!([1, 2])).unwrap_err();
    assert_eq!(e.field, "mcq");
  }

  #[test]
  fn validate_applies_defaults() {
    let n = validate(&candidate("Powerhouse?", "Biology")).unwrap();
    assert_eq!(n.correct, 1);
    assert_eq!(n.topic, "Biology");
    assert_eq!(n.difficulty, Difficulty::Medium);
    assert_eq!(n.explanation, NO_EXPLANATION);
  }

  #[test]
  fn validate_rejects_unknown_difficulty() {
    let mut c = candidate("q", "Biology");
    c["difficulty"] = json!("extreme");
    assert_eq!(validate(&c).unwrap_err().field, "difficulty");
  }

  #[tokio::test]
  async fn add_one_persists_and_lists() {
    let (_dir, bank) = bank().await;
    let added = bank.add_one(&candidate("Powerhouse?", "Biology")).await.unwrap();
    assert_eq!(added.options.len(), 4);
    assert_eq!(added.correct_text(), "Mitochondria");
    assert!(added.created_at.is_some());

    let all = bank.list(None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, added.id);
  }

  #[tokio::test]
  async fn add_one_with_bad_answer_leaves_store_unchanged() {
    let (_dir, bank) = bank().await;
    bank.add_one(&candidate("first", "Biology")).await.unwrap();

    let mut bad = candidate("second", "Biology");
    bad["correctAnswer"] = json!("Chloroplast");
    let err = bank.add_one(&bad).await.unwrap_err();
    assert!(matches!(err, IngestError::Invalid(ref e) if e.field == "correctAnswer"));
    assert_eq!(bank.list(None).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn add_one_keeps_unreadable_stored_records() {
    let (_dir, bank) = bank().await;
    let legacy = json!({ "mcqs": [
      { "id": "legacy", "question": "q", "options": ["a", "b", "c", "d"], "correctAnswer": "a ", "subject": "Physics" }
    ] });
    std::fs::write(bank.store().path(), legacy.to_string()).unwrap();

    bank.add_one(&candidate("fresh", "Biology")).await.unwrap();

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(bank.store().path()).unwrap()).unwrap();
    let ids: Vec<&str> = raw["mcqs"].as_array().unwrap().iter().map(|m| m["id"].as_str().unwrap()).collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], "legacy");
    assert_eq!(bank.list(None).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn add_many_isolates_failures() {
    let (_dir, bank) = bank().await;
    bank.add_one(&candidate("existing", "Physics")).await.unwrap();

    let mut missing = candidate("x", "Biology");
    missing.as_object_mut().unwrap().remove("subject");
    let batch = vec![
      candidate("one", "Biology"),
      json!({ "question": "two" }),
      candidate("three", "Chemistry"),
      missing.clone(),
      candidate("five", "Biology"),
    ];
    let outcome = bank.add_many(&batch).await.unwrap();
    assert_eq!(outcome.added.len(), 3);
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(outcome.failures[0].index, 1);
    assert_eq!(outcome.failures[1].input, missing);

    let all = bank.list(None).await.unwrap();
    assert_eq!(all.len(), 4);
    let questions: Vec<&str> = all.iter().map(|m| m.question.as_str()).collect();
    assert_eq!(questions, ["existing", "one", "three", "five"]);
  }

  #[tokio::test]
  async fn add_many_all_invalid_does_not_write() {
    let (_dir, bank) = bank().await;
    let outcome = bank.add_many(&[json!({}), json!(null)]).await.unwrap();
    assert!(outcome.added.is_empty());
    assert_eq!(outcome.failures.len(), 2);
    assert!(!bank.store().path().exists());
  }

  #[tokio::test]
  async fn list_filters_case_insensitively() {
    let (_dir, bank) = bank().await;
    bank.add_one(&candidate("a", "Biology")).await.unwrap();
    bank.add_one(&candidate("b", "physics")).await.unwrap();
    bank.add_one(&candidate("c", "BIOLOGY")).await.unwrap();

    let upper = bank.list(Some("Biology")).await.unwrap();
    let lower = bank.list(Some("biology")).await.unwrap();
    assert_eq!(upper, lower);
    assert_eq!(upper.len(), 2);
    assert_eq!(bank.list(Some("  ")).await.unwrap().len(), 3);
  }
}
