//! Flat-file MCQ store: a single JSON document `{ "mcqs": [...] }`.
//!
//! The whole document is loaded on every read and rewritten on every append.
//! Saves go through a sibling temp file + rename so readers never observe a partial
//! write. Appends inside this process are serialized; other processes writing the
//! same file can still race (last write wins).
//!
//! Elements of `mcqs` are converted one by one. An element that cannot be read as an
//! MCQ is hidden from readers but stays in the file untouched: appends operate on the
//! raw element list, so nothing already stored is ever rewritten or dropped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::domain::{Difficulty, Mcq, StoredMcq};
use crate::error::StoreError;

#[derive(Default, Serialize, Deserialize)]
struct Document {
  #[serde(default)]
  mcqs: Vec<Value>,
}

/// Scalar JSON as text. Older writers stored numeric options and answers as numbers.
fn scalar_text(v: &Value) -> Option<String> {
  match v {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn opt_text(v: &Value, field: &str) -> Option<String> {
  v.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Lenient read of one persisted element. None when required fields are unusable.
fn stored_from_value(v: &Value) -> Option<StoredMcq> {
  let options: Vec<String> = v.get("options")?.as_array()?.iter().map(scalar_text).collect::<Option<_>>()?;
  Some(StoredMcq {
    id: scalar_text(v.get("id")?)?,
    question: scalar_text(v.get("question")?)?,
    options: options.try_into().ok()?,
    correct_answer: scalar_text(v.get("correctAnswer")?)?,
    subject: scalar_text(v.get("subject")?)?,
    topic: opt_text(v, "topic"),
    difficulty: v.get("difficulty").and_then(Value::as_str).and_then(Difficulty::parse),
    explanation: opt_text(v, "explanation"),
    created_at: v
      .get("createdAt")
      .and_then(Value::as_str)
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|d| d.with_timezone(&Utc)),
  })
}

fn to_mcq(index: usize, v: &Value) -> Option<Mcq> {
  let Some(stored) = stored_from_value(v) else {
    warn!(target: "etea_backend", index, "Skipping stored element that is not a readable MCQ");
    return None;
  };
  match stored.into_mcq() {
    Ok(m) => Some(m),
    Err(bad) => {
      warn!(target: "etea_backend", id = %bad.id, "Skipping stored MCQ whose correctAnswer is not among its options");
      None
    }
  }
}

fn to_value(m: &Mcq) -> Result<Value, StoreError> {
  Ok(serde_json::to_value(StoredMcq::from(m))?)
}

pub struct McqStore {
  path: PathBuf,
  write_lock: Mutex<()>,
}

impl McqStore {
  /// Open the store at `path`. The file itself is created lazily on first save.
  pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
    let path = path.into();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await?;
    }
    Ok(Self { path, write_lock: Mutex::new(()) })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  async fn load_raw(&self) -> Result<Vec<Value>, StoreError> {
    let raw = match tokio::fs::read_to_string(&self.path).await {
      Ok(s) => s,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        debug!(target: "etea_backend", "Store file not found; starting empty");
        return Ok(Vec::new());
      }
      Err(e) => return Err(e.into()),
    };
    if raw.trim().is_empty() {
      return Ok(Vec::new());
    }
    let doc: Document = serde_json::from_str(&raw)?;
    Ok(doc.mcqs)
  }

  async fn save_raw(&self, mcqs: Vec<Value>) -> Result<(), StoreError> {
    let body = serde_json::to_string_pretty(&Document { mcqs })?;

    let mut tmp = self.path.clone().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, &self.path).await?;
    Ok(())
  }

  /// Load all readable records in insertion order. A missing file is an empty store.
  #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
  pub async fn load(&self) -> Result<Vec<Mcq>, StoreError> {
    let raw = self.load_raw().await?;
    Ok(raw.iter().enumerate().filter_map(|(i, v)| to_mcq(i, v)).collect())
  }

  /// Overwrite the backing file with `records`.
  #[instrument(level = "debug", skip(self, records), fields(path = %self.path.display(), count = records.len()))]
  pub async fn save(&self, records: &[Mcq]) -> Result<(), StoreError> {
    let mcqs = records.iter().map(to_value).collect::<Result<Vec<_>, _>>()?;
    self.save_raw(mcqs).await
  }

  /// Run one read-append-write cycle under the in-process write lock.
  /// `f` sees the readable records and returns the records to append plus a value.
  /// Existing elements, readable or not, are written back unchanged.
  pub async fn append<T, F>(&self, f: F) -> Result<T, StoreError>
  where
    F: FnOnce(&[Mcq]) -> (Vec<Mcq>, T),
  {
    let _guard = self.write_lock.lock().await;
    let mut raw = self.load_raw().await?;
    let current: Vec<Mcq> = raw.iter().enumerate().filter_map(|(i, v)| to_mcq(i, v)).collect();
    let (added, value) = f(&current);
    if !added.is_empty() {
      for m in &added {
        raw.push(to_value(m)?);
      }
      self.save_raw(raw).await?;
    }
    Ok(value)
  }
}
