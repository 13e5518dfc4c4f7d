//! Practice session controller.
//!
//! One `PracticeSession` tracks which question set is active (sample / stored /
//! generated), the position in it, answers given so far and bookmarks. It performs no
//! I/O: switching to the stored bank returns a `FetchRequest` which the caller runs and
//! reports back through `complete_fetch`. Only the most recent fetch is applied.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Difficulty, Mcq, Subject};
use crate::error::SessionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
  #[default]
  Sample,
  Stored,
  Generated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SetStatus {
  Ready,
  /// A stored-bank fetch is in flight; no question is displayed.
  Loading,
  /// The last fetch failed. The session stays usable (switch source or retry).
  Failed { message: String },
}

/// Work the caller must perform for the session: load stored questions for `subject`
/// (all subjects when None) and hand the result to `complete_fetch` with `ticket`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
  pub ticket: u64,
  pub subject: Option<Subject>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
  pub index: usize,
  pub selected: usize,
  pub correct: bool,
  pub correct_answer: usize,
  pub explanation: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
  pub id: String,
  pub subject: String,
  pub topic: String,
  pub difficulty: Difficulty,
  pub question: String,
  pub options: [String; 4],
  pub bookmarked: bool,
  /// Option recorded for this index, if it was answered earlier in the session.
  pub answered_with: Option<usize>,
  /// Only present while the answer is revealed.
  pub correct_answer: Option<usize>,
  pub explanation: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
  pub subject: Option<Subject>,
  pub source: QuestionSource,
  pub status: SetStatus,
  pub current_index: usize,
  pub total: usize,
  pub answered: usize,
  pub correct: usize,
  pub selected_answer: Option<usize>,
  pub revealed: bool,
  pub question: Option<QuestionView>,
}

pub struct PracticeSession {
  subject: Option<Subject>,
  source: QuestionSource,
  samples: Vec<Mcq>,
  stored: Vec<Mcq>,
  generated: Vec<Mcq>,
  active: Vec<Mcq>,
  status: SetStatus,
  current: usize,
  selected: Option<usize>,
  revealed: bool,
  // index -> chosen option; the key set is the "answered" set
  answers: BTreeMap<usize, usize>,
  bookmarked: HashSet<String>,
  next_ticket: u64,
  pending: Option<u64>,
}

impl PracticeSession {
  pub fn new(samples: Vec<Mcq>) -> Self {
    let mut s = Self {
      subject: None,
      source: QuestionSource::Sample,
      samples,
      stored: Vec::new(),
      generated: Vec::new(),
      active: Vec::new(),
      status: SetStatus::Ready,
      current: 0,
      selected: None,
      revealed: false,
      answers: BTreeMap::new(),
      bookmarked: HashSet::new(),
      next_ticket: 0,
      pending: None,
    };
    s.rebuild_active();
    s
  }

  pub fn subject(&self) -> Option<Subject> {
    self.subject
  }

  pub fn source(&self) -> QuestionSource {
    self.source
  }

  pub fn status(&self) -> &SetStatus {
    &self.status
  }

  pub fn active(&self) -> &[Mcq] {
    &self.active
  }

  pub fn current_index(&self) -> usize {
    self.current
  }

  pub fn selected_answer(&self) -> Option<usize> {
    self.selected
  }

  pub fn is_revealed(&self) -> bool {
    self.revealed
  }

  pub fn is_answered(&self, index: usize) -> bool {
    self.answers.contains_key(&index)
  }

  pub fn is_bookmarked(&self, id: &str) -> bool {
    self.bookmarked.contains(id)
  }

  /// The displayed question. None while loading, after a failed fetch, or with an empty set.
  pub fn current(&self) -> Option<&Mcq> {
    if self.status != SetStatus::Ready {
      return None;
    }
    self.active.get(self.current)
  }

  fn belongs(&self, m: &Mcq) -> bool {
    self.subject.map_or(true, |s| s.matches_label(&m.subject))
  }

  fn rebuild_active(&mut self) {
    self.active = match self.source {
      QuestionSource::Sample => self.samples.iter().filter(|m| self.belongs(m)).cloned().collect(),
      QuestionSource::Generated => self.generated.iter().filter(|m| self.belongs(m)).cloned().collect(),
      // Already scoped to the subject by the fetch.
      QuestionSource::Stored => self.stored.clone(),
    };
  }

  fn reset_progress(&mut self) {
    self.current = 0;
    self.selected = None;
    self.revealed = false;
    self.answers.clear();
  }

  fn start_fetch(&mut self) -> FetchRequest {
    self.next_ticket += 1;
    let ticket = self.next_ticket;
    self.pending = Some(ticket);
    self.status = SetStatus::Loading;
    self.stored.clear();
    self.active.clear();
    FetchRequest { ticket, subject: self.subject }
  }

  /// Pick a subject; the active set becomes that subject's records from the current source.
  pub fn select_subject(&mut self, subject: Subject) -> Option<FetchRequest> {
    debug!(target: "session", %subject, source = ?self.source, "Subject selected");
    self.subject = Some(subject);
    self.reset_progress();
    if self.source == QuestionSource::Stored {
      return Some(self.start_fetch());
    }
    self.rebuild_active();
    None
  }

  /// Change the question source. Switching to `Stored` starts a fetch.
  pub fn switch_source(&mut self, source: QuestionSource) -> Option<FetchRequest> {
    debug!(target: "session", ?source, "Source switched");
    self.source = source;
    self.reset_progress();
    if source == QuestionSource::Stored {
      return Some(self.start_fetch());
    }
    self.pending = None;
    self.status = SetStatus::Ready;
    self.rebuild_active();
    None
  }

  /// Apply a fetch result. Returns false (and changes nothing) for stale tickets.
  pub fn complete_fetch(&mut self, ticket: u64, result: Result<Vec<Mcq>, String>) -> bool {
    if self.pending != Some(ticket) || self.source != QuestionSource::Stored {
      debug!(target: "session", ticket, "Ignoring stale fetch result");
      return false;
    }
    self.pending = None;
    match result {
      Ok(records) => {
        self.stored = records;
        self.status = SetStatus::Ready;
        self.rebuild_active();
      }
      Err(message) => {
        self.stored.clear();
        self.active.clear();
        self.status = SetStatus::Failed { message };
      }
    }
    self.reset_progress();
    true
  }

  /// Install freshly generated questions and practice them.
  pub fn load_generated(&mut self, records: Vec<Mcq>) {
    self.generated = records;
    self.source = QuestionSource::Generated;
    self.pending = None;
    self.status = SetStatus::Ready;
    self.reset_progress();
    self.rebuild_active();
  }

  /// Answer the current question. A question stays locked once answered until reset.
  pub fn select_answer(&mut self, option: usize) -> Result<AnswerOutcome, SessionError> {
    let index = self.current;
    let q = self.current().ok_or(SessionError::NoQuestion)?;
    if option >= q.options.len() {
      return Err(SessionError::InvalidOption(option));
    }
    if self.answers.contains_key(&index) {
      return Err(SessionError::AlreadyAnswered(index));
    }
    let outcome = AnswerOutcome {
      index,
      selected: option,
      correct: q.is_correct(option),
      correct_answer: q.correct,
      explanation: q.explanation.clone(),
    };
    self.answers.insert(index, option);
    self.selected = Some(option);
    self.revealed = true;
    Ok(outcome)
  }

  fn clear_reveal(&mut self) {
    self.selected = None;
    self.revealed = false;
  }

  /// Move forward; false at the last question or with nothing displayed.
  pub fn next(&mut self) -> bool {
    if self.current().is_none() || self.current + 1 >= self.active.len() {
      return false;
    }
    self.current += 1;
    self.clear_reveal();
    true
  }

  /// Move back; false at the first question or with nothing displayed.
  pub fn prev(&mut self) -> bool {
    if self.current().is_none() || self.current == 0 {
      return false;
    }
    self.current -= 1;
    self.clear_reveal();
    true
  }

  /// Flip the bookmark on the current question. Returns the new state, None without a question.
  pub fn toggle_bookmark(&mut self) -> Option<bool> {
    let id = self.current()?.id.clone();
    if self.bookmarked.remove(&id) {
      Some(false)
    } else {
      self.bookmarked.insert(id);
      Some(true)
    }
  }

  /// Back to subject selection with the sample source; all per-session state is dropped.
  pub fn reset(&mut self) {
    self.subject = None;
    self.source = QuestionSource::Sample;
    self.stored.clear();
    self.generated.clear();
    self.status = SetStatus::Ready;
    self.pending = None;
    self.bookmarked.clear();
    self.reset_progress();
    self.rebuild_active();
  }

  /// (answered, correct, total) for the active set.
  pub fn progress(&self) -> (usize, usize, usize) {
    let correct = self
      .answers
      .iter()
      .filter(|(i, opt)| self.active.get(**i).is_some_and(|m| m.is_correct(**opt)))
      .count();
    (self.answers.len(), correct, self.active.len())
  }

  pub fn view(&self) -> SessionView {
    let (answered, correct, _) = self.progress();
    let total = if self.status == SetStatus::Ready { self.active.len() } else { 0 };
    let question = self.current().map(|m| QuestionView {
      id: m.id.clone(),
      subject: m.subject.clone(),
      topic: m.topic.clone(),
      difficulty: m.difficulty,
      question: m.question.clone(),
      options: m.options.clone(),
      bookmarked: self.bookmarked.contains(&m.id),
      answered_with: self.answers.get(&self.current).copied(),
      correct_answer: self.revealed.then_some(m.correct),
      explanation: self.revealed.then(|| m.explanation.clone()),
    });
    SessionView {
      subject: self.subject,
      source: self.source,
      status: self.status.clone(),
      current_index: self.current,
      total,
      answered,
      correct,
      selected_answer: self.selected,
      revealed: self.revealed,
      question,
    }
  }
}
