use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use etea_backend::bank::QuestionBank;
use etea_backend::config::{GenerationCfg, Prompts};
use etea_backend::generation::Generator;
use etea_backend::openai::OpenAI;
use etea_backend::store::McqStore;
use etea_backend::{build_router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

#[allow(dead_code)]
pub struct TestApp {
    pub address: String,
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub api_client: reqwest::Client,
    // Keeps the store directory alive for the duration of the test.
    _dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.api_client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// App without a model: generation endpoints answer 503.
#[allow(dead_code)]
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Generator::new(None, Prompts::default(), GenerationCfg::default())).await
}

pub async fn spawn_app_with(generator: Generator) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("data").join("db.json");
    let store = McqStore::open(db_path.clone()).await.expect("Failed to open store");
    let state = Arc::new(AppState::new(QuestionBank::new(store), generator));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server error");
    });

    TestApp {
        address: format!("http://{}", addr),
        addr,
        db_path,
        api_client: reqwest::Client::new(),
        _dir: dir,
    }
}

#[allow(dead_code)]
pub struct MockModel {
    pub base_url: String,
    pub calls: Arc<AtomicUsize>,
}

struct MockState {
    status: StatusCode,
    body: Value,
    calls: Arc<AtomicUsize>,
}

async fn completions(State(m): State<Arc<MockState>>, Json(_req): Json<Value>) -> (StatusCode, Json<Value>) {
    m.calls.fetch_add(1, Ordering::SeqCst);
    (m.status, Json(m.body.clone()))
}

/// OpenAI-compatible `/v1/chat/completions` that always answers with `reply` as the
/// assistant message.
#[allow(dead_code)]
pub async fn spawn_mock_model(reply: &str) -> MockModel {
    let body = json!({
        "choices": [{ "message": { "role": "assistant", "content": reply } }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30 }
    });
    spawn_mock(StatusCode::OK, body).await
}

/// Mock that fails every call with `status` and an OpenAI-style error body.
#[allow(dead_code)]
pub async fn spawn_failing_model(status: StatusCode) -> MockModel {
    spawn_mock(status, json!({ "error": { "message": "upstream exploded" } })).await
}

async fn spawn_mock(status: StatusCode, body: Value) -> MockModel {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = Arc::new(MockState { status, body, calls: calls.clone() });
    let app = Router::new().route("/v1/chat/completions", post(completions)).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind mock port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock server error");
    });

    MockModel { base_url: format!("http://{}/v1", addr), calls }
}

#[allow(dead_code)]
pub fn generator_for(mock: &MockModel) -> Generator {
    let oa = OpenAI::new("test-key", mock.base_url.clone(), "mock-model", Duration::from_secs(5))
        .expect("Failed to build client");
    Generator::new(Some(oa), Prompts::default(), GenerationCfg::default())
}

/// Model reply text: some prose around a JSON array of `n` physics questions.
#[allow(dead_code)]
pub fn model_reply(n: usize) -> String {
    let items: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "question": format!("Generated question {}?", i + 1),
                "options": ["Joule", "Newton", "Watt", "Pascal"],
                "correctAnswer": 1,
                "explanation": "Newton is the SI unit of force.",
                "topic": "Mechanics"
            })
        })
        .collect();
    format!(
        "Here are your questions:\n```json\n{}\n```\nGood luck!",
        serde_json::to_string_pretty(&items).unwrap()
    )
}

#[allow(dead_code)]
pub fn valid_mcq(question: &str, subject: &str) -> Value {
    json!({
        "question": question,
        "options": ["Nucleus", "Mitochondria", "Ribosome", "Golgi body"],
        "correctAnswer": "Mitochondria",
        "subject": subject
    })
}
