//! Application state: the question bank (owning the flat-file store) and the
//! generation adapter.
//!
//! The store is opened once at startup and shared by every handler through
//! `Arc<AppState>`; nothing here is process-global.

use std::time::Duration;

use tracing::{info, instrument};

use crate::bank::QuestionBank;
use crate::config::Settings;
use crate::error::StoreError;
use crate::generation::Generator;
use crate::openai::OpenAI;
use crate::store::McqStore;

pub struct AppState {
    pub bank: QuestionBank,
    pub generator: Generator,
}

impl AppState {
    pub fn new(bank: QuestionBank, generator: Generator) -> Self {
        Self { bank, generator }
    }

    /// Build state from resolved settings: open the store, init the optional OpenAI client.
    #[instrument(level = "info", skip_all, fields(db_path = %settings.db_path.display()))]
    pub async fn from_settings(settings: &Settings) -> Result<Self, StoreError> {
        let store = McqStore::open(settings.db_path.clone()).await?;
        let existing = store.load().await?.len();
        info!(target: "etea_backend", path = %store.path().display(), records = existing, "Question bank opened");

        let gen_cfg = settings.file.generation.clone();
        let openai = OpenAI::from_env(Duration::from_secs(gen_cfg.timeout_secs));
        if let Some(oa) = &openai {
            info!(target: "etea_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "etea_backend", "OpenAI disabled (no OPENAI_API_KEY). Generation endpoints will return 503.");
        }

        let generator = Generator::new(openai, settings.file.prompts.clone(), gen_cfg);
        Ok(Self::new(QuestionBank::new(store), generator))
    }
}
