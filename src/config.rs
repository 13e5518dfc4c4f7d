//! Configuration: environment variables plus an optional TOML file.
//!
//! The TOML file (path in ETEA_CONFIG_PATH) can override the generation prompts and
//! limits. See `FileConfig` for the expected schema:
//!
//! ```toml
//! [generation]
//! max_count = 20
//! timeout_secs = 60
//! temperature = 0.7
//!
//! [prompts]
//! system = "..."
//! user_template = "Generate {count} ... {subject} ... {topic_line} ... {difficulty}"
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct FileConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub generation: GenerationCfg,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationCfg {
  /// Upper bound for the `count` of a single generation request.
  pub max_count: usize,
  /// Client-side timeout of one model call.
  pub timeout_secs: u64,
  pub temperature: f32,
}

impl Default for GenerationCfg {
  fn default() -> Self {
    Self { max_count: 20, timeout_secs: 60, temperature: 0.7 }
  }
}

/// Prompts sent to the model. Placeholders: {count}, {subject}, {topic_line}, {difficulty}.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub system: String,
  pub user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system: "You write multiple choice questions for exam preparation. Reply with a JSON array only.".into(),
      user_template: r#"Generate {count} multiple choice questions for ETEA (Educational Testing and Evaluation Agency) test preparation in Pakistan.

Subject: {subject}
{topic_line}
Difficulty: {difficulty}

Requirements:
1. Questions should be relevant to Pakistani curriculum and ETEA exam pattern
2. Each question should have exactly 4 options (A, B, C, D)
3. Include detailed explanations for correct answers
4. Questions should be challenging but fair for {difficulty} level
5. Use proper scientific terminology and Pakistani educational context

Format your response as a JSON array with this exact structure:
[
  {
    "question": "Question text here?",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correctAnswer": 0,
    "explanation": "Detailed explanation of why this answer is correct",
    "topic": "Specific topic name"
  }
]

Generate exactly {count} questions. Ensure all questions are unique and educationally valuable."#
        .into(),
    }
  }
}

/// Settings resolved from the environment at startup.
#[derive(Clone, Debug)]
pub struct Settings {
  pub addr: SocketAddr,
  pub db_path: PathBuf,
  pub file: FileConfig,
}

impl Settings {
  /// PORT (default 3001), DB_PATH (default ./data/db.json), ETEA_CONFIG_PATH (optional).
  pub fn from_env() -> Self {
    let addr = std::env::var("PORT")
      .ok()
      .and_then(|p| p.parse::<u16>().ok())
      .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
      .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3001)));
    let db_path = std::env::var("DB_PATH")
      .map(PathBuf::from)
      .unwrap_or_else(|_| PathBuf::from("./data/db.json"));
    let file = load_file_config_from_env().unwrap_or_default();
    Self { addr, db_path, file }
  }
}

/// Attempt to load `FileConfig` from ETEA_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_file_config_from_env() -> Option<FileConfig> {
  let path = std::env::var("ETEA_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_file_config(&s) {
      Ok(cfg) => {
        info!(target: "etea_backend", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "etea_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "etea_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_file_config(s: &str) -> Result<FileConfig, toml::de::Error> {
  toml::from_str::<FileConfig>(s)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg = parse_file_config("[generation]\nmax_count = 5\n").unwrap();
    assert_eq!(cfg.generation.max_count, 5);
    assert_eq!(cfg.generation.timeout_secs, 60);
    assert!(cfg.prompts.user_template.contains("{count}"));
  }

  #[test]
  fn prompts_can_be_overridden() {
    let cfg = parse_file_config("[prompts]\nsystem = \"be brief\"\n").unwrap();
    assert_eq!(cfg.prompts.system, "be brief");
    assert!(cfg.prompts.user_template.contains("ETEA"));
  }

  #[test]
  fn empty_file_is_default() {
    let cfg = parse_file_config("").unwrap();
    assert_eq!(cfg.generation.max_count, 20);
  }
}
