//! WebSocket upgrade + message loop. Each connection owns one practice session; client
//! messages are parsed as JSON and applied to it. Most requests get a single JSON reply.
//! A stored-bank fetch first pushes a `loading` snapshot, then the loaded one.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug, warn};

use crate::error::SessionError;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::routes::http::run_generation;
use crate::seeds::sample_questions;
use crate::session::{FetchRequest, PracticeSession};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "etea_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "etea_backend", "WebSocket connected");
  let mut session = PracticeSession::new(sample_questions());

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "session", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &mut session, &state, &mut socket).await
          }
          Err(e) => Ok(ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }),
        };

        let sent = match reply {
          Ok(reply_msg) => send(&mut socket, &reply_msg).await,
          Err(e) => Err(e),
        };
        if let Err(e) = sent {
          error!(target: "etea_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "etea_backend", "WebSocket disconnected");
}

fn snapshot(session: &PracticeSession) -> ServerWsMessage {
  ServerWsMessage::Session { session: session.view() }
}

fn session_error(e: SessionError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string() }
}

/// Push the `loading` snapshot, load the subject's stored records and apply them.
async fn run_fetch(
  req: FetchRequest,
  session: &mut PracticeSession,
  state: &AppState,
  socket: &mut WebSocket,
) -> Result<(), axum::Error> {
  send(socket, &snapshot(session)).await?;
  let result = match state.bank.list(None).await {
    Ok(records) => Ok(
      records
        .into_iter()
        .filter(|m| req.subject.map_or(true, |s| s.matches_label(&m.subject)))
        .collect(),
    ),
    Err(e) => {
      error!(target: "session", error = %e, "Stored question fetch failed");
      Err("Failed to fetch MCQs. Please try again.".to_string())
    }
  };
  session.complete_fetch(req.ticket, result);
  Ok(())
}

/// Apply one client message. The returned message is the final reply; intermediate
/// snapshots are sent directly on `socket`.
async fn handle_client_ws(
  msg: ClientWsMessage,
  session: &mut PracticeSession,
  state: &AppState,
  socket: &mut WebSocket,
) -> Result<ServerWsMessage, axum::Error> {
  let reply = match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::State => snapshot(session),

    ClientWsMessage::SelectSubject { subject } => {
      if let Some(req) = session.select_subject(subject) {
        run_fetch(req, session, state, socket).await?;
      }
      snapshot(session)
    }

    ClientWsMessage::SwitchSource { source } => {
      if let Some(req) = session.switch_source(source) {
        run_fetch(req, session, state, socket).await?;
      }
      snapshot(session)
    }

    ClientWsMessage::Generate { subject, topic, difficulty, count, mixed } => {
      if let Some(s) = subject.filter(|s| session.subject() != Some(*s)) {
        if let Some(req) = session.select_subject(s) {
          run_fetch(req, session, state, socket).await?;
        }
      }
      let Some(subject) = session.subject() else {
        return Ok(session_error(SessionError::NoSubject));
      };
      match run_generation(state, subject, topic, difficulty, count, mixed).await {
        Ok(questions) => {
          info!(target: "session", %subject, count = questions.len(), "WS generated questions loaded");
          session.load_generated(questions);
          snapshot(session)
        }
        Err(e) => {
          warn!(target: "session", %subject, error = %e, "WS generate failed");
          ServerWsMessage::Error { message: e.to_string() }
        }
      }
    }

    ClientWsMessage::Answer { option } => match session.select_answer(option) {
      Ok(outcome) => {
        info!(target: "session", index = outcome.index, correct = outcome.correct, "WS answer evaluated");
        ServerWsMessage::AnswerResult {
          index: outcome.index,
          selected: outcome.selected,
          correct: outcome.correct,
          correct_answer: outcome.correct_answer,
          explanation: outcome.explanation,
          session: session.view(),
        }
      }
      Err(e) => session_error(e),
    },

    ClientWsMessage::Next => {
      session.next();
      snapshot(session)
    }

    ClientWsMessage::Prev => {
      session.prev();
      snapshot(session)
    }

    ClientWsMessage::ToggleBookmark => match session.toggle_bookmark() {
      Some(_) => snapshot(session),
      None => session_error(SessionError::NoQuestion),
    },

    ClientWsMessage::Reset => {
      session.reset();
      snapshot(session)
    }
  };
  Ok(reply)
}
