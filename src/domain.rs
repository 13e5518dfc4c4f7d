//! Domain models: subjects, difficulty levels and the MCQ record itself.
//!
//! Internally the correct answer is always an index into `options`. The text form
//! (`StoredMcq::correct_answer`) only exists at the file/bank-API boundary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when neither the uploader nor the model supplied an explanation.
pub const NO_EXPLANATION: &str = "No explanation provided.";

/// Fixed subject list used by generation and practice sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Subject {
  Biology,
  Physics,
  Chemistry,
  Mathematics,
  English,
  GeneralKnowledge,
}

impl Subject {
  pub const ALL: [Subject; 6] = [
    Subject::Biology,
    Subject::Physics,
    Subject::Chemistry,
    Subject::Mathematics,
    Subject::English,
    Subject::GeneralKnowledge,
  ];

  /// Slug as used in URLs, JSON and the `subject` field of records.
  pub fn as_str(&self) -> &'static str {
    match self {
      Subject::Biology => "biology",
      Subject::Physics => "physics",
      Subject::Chemistry => "chemistry",
      Subject::Mathematics => "mathematics",
      Subject::English => "english",
      Subject::GeneralKnowledge => "general-knowledge",
    }
  }

  /// Human readable name, used in prompts.
  pub fn display_name(&self) -> &'static str {
    match self {
      Subject::Biology => "Biology",
      Subject::Physics => "Physics",
      Subject::Chemistry => "Chemistry",
      Subject::Mathematics => "Mathematics",
      Subject::English => "English",
      Subject::GeneralKnowledge => "General Knowledge",
    }
  }

  /// Case-insensitive lookup by slug or display name.
  pub fn parse(s: &str) -> Option<Subject> {
    let s = s.trim();
    Subject::ALL
      .into_iter()
      .find(|sub| sub.as_str().eq_ignore_ascii_case(s) || sub.display_name().eq_ignore_ascii_case(s))
  }

  /// True if a free-text subject label refers to this subject.
  pub fn matches_label(&self, label: &str) -> bool {
    Subject::parse(label) == Some(*self)
  }
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }

  pub fn parse(s: &str) -> Option<Difficulty> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Some(Difficulty::Easy),
      "medium" => Some(Difficulty::Medium),
      "hard" => Some(Difficulty::Hard),
      _ => None,
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Core MCQ record.
#[derive(Clone, Debug, PartialEq)]
pub struct Mcq {
  pub id: String,
  pub question: String,
  pub options: [String; 4],
  /// Zero-based index into `options`.
  pub correct: usize,
  /// Free-text label for stored records; a `Subject` slug for samples and generated ones.
  pub subject: String,
  pub topic: String,
  pub difficulty: Difficulty,
  pub explanation: String,
  pub created_at: Option<DateTime<Utc>>,
}

impl Mcq {
  pub fn correct_text(&self) -> &str {
    &self.options[self.correct]
  }

  pub fn is_correct(&self, option: usize) -> bool {
    option == self.correct
  }
}

/// Record shape of the persisted JSON document and of the bank HTTP API.
/// `correctAnswer` is the literal text of the correct option.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMcq {
  pub id: String,
  pub question: String,
  pub options: [String; 4],
  pub correct_answer: String,
  pub subject: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub topic: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub difficulty: Option<Difficulty>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
}

impl From<&Mcq> for StoredMcq {
  fn from(m: &Mcq) -> Self {
    StoredMcq {
      id: m.id.clone(),
      question: m.question.clone(),
      options: m.options.clone(),
      correct_answer: m.correct_text().to_string(),
      subject: m.subject.clone(),
      topic: Some(m.topic.clone()),
      difficulty: Some(m.difficulty),
      explanation: Some(m.explanation.clone()),
      created_at: m.created_at,
    }
  }
}

impl StoredMcq {
  /// Convert to the internal form. Fails (returns the offending record back) when the
  /// stored correct answer is not one of the options.
  pub fn into_mcq(self) -> Result<Mcq, StoredMcq> {
    let Some(correct) = self.options.iter().position(|o| *o == self.correct_answer) else {
      return Err(self);
    };
    let topic = match self.topic {
      Some(t) if !t.trim().is_empty() => t,
      _ => self.subject.clone(),
    };
    Ok(Mcq {
      id: self.id,
      question: self.question,
      options: self.options,
      correct,
      subject: self.subject,
      topic,
      difficulty: self.difficulty.unwrap_or_default(),
      explanation: self
        .explanation
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| NO_EXPLANATION.to_string()),
      created_at: self.created_at,
    })
  }
}
