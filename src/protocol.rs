//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! Two answer encodings exist on the wire:
//! - bank endpoints (`/api/mcqs*`) carry `correctAnswer` as option text (`StoredMcq`);
//! - generation, samples and the practice socket carry it as an index (`QuestionOut`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bank::BulkFailure;
use crate::domain::{Difficulty, Mcq, StoredMcq, Subject};
use crate::session::{QuestionSource, SessionView};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    State,
    SelectSubject {
        subject: Subject,
    },
    SwitchSource {
        source: QuestionSource,
    },
    /// Generate questions for the session's subject (or `subject`, which then becomes
    /// the session's subject).
    Generate {
        #[serde(default)]
        subject: Option<Subject>,
        #[serde(default)]
        topic: Option<String>,
        #[serde(default)]
        difficulty: Option<Difficulty>,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        mixed: bool,
    },
    Answer {
        option: usize,
    },
    Next,
    Prev,
    ToggleBookmark,
    Reset,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionView,
    },
    AnswerResult {
        index: usize,
        selected: usize,
        correct: bool,
        #[serde(rename = "correctAnswer")]
        correct_answer: usize,
        explanation: String,
        session: SessionView,
    },
    Error {
        message: String,
    },
}

/// Question DTO with an index `correctAnswer` (generated and sample questions).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOut {
    pub id: String,
    pub question: String,
    pub options: [String; 4],
    pub correct_answer: usize,
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub explanation: String,
}

impl From<&Mcq> for QuestionOut {
    fn from(m: &Mcq) -> Self {
        QuestionOut {
            id: m.id.clone(),
            question: m.question.clone(),
            options: m.options.clone(),
            correct_answer: m.correct,
            subject: m.subject.clone(),
            topic: m.topic.clone(),
            difficulty: m.difficulty,
            explanation: m.explanation.clone(),
        }
    }
}

pub fn to_stored(records: &[Mcq]) -> Vec<StoredMcq> {
    records.iter().map(StoredMcq::from).collect()
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct SubjectQuery {
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    pub format: Option<String>,
}

#[derive(Serialize)]
pub struct McqCreatedOut {
    pub message: String,
    pub mcq: StoredMcq,
}

#[derive(Serialize)]
pub struct BulkCreatedOut {
    pub message: String,
    pub mcqs: Vec<StoredMcq>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkErrorOut {
    pub message: String,
    pub field: &'static str,
    pub index: usize,
    pub mcq_data: Value,
}

impl From<BulkFailure> for BulkErrorOut {
    fn from(f: BulkFailure) -> Self {
        BulkErrorOut {
            message: f.error.message,
            field: f.error.field,
            index: f.index,
            mcq_data: f.input,
        }
    }
}

/// Partial bulk failure. Valid records were committed; `addedMcqs` is omitted when none were.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPartialOut {
    pub message: String,
    pub added_count: usize,
    pub error_count: usize,
    pub errors: Vec<BulkErrorOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_mcqs: Option<Vec<StoredMcq>>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub subject: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub mixed: bool,
}

#[derive(Serialize, Deserialize)]
pub struct QuestionsOut {
    pub questions: Vec<QuestionOut>,
}

#[derive(Serialize)]
pub struct SubjectOut {
    pub id: Subject,
    pub name: &'static str,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
