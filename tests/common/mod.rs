#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use figure_qbank::{
    errors::{AppError, AppResult},
    models::domain::{ArticleChunkRecord, FigureRecord},
    repositories::CorpusFile,
    services::{
        model_service::{ChatMessage, LlmProvider, RoleSettings},
        pricing::{ModelPrice, PricingTable},
        refinement_engine::{RefinementEngine, RefinementSettings},
        token_counter::TokenCounter,
    },
};

pub const GENERATOR_MODEL: &str = "gen-model";
pub const VALIDATOR_MODEL: &str = "val-model";
pub const FORMAT_MODEL: &str = "fmt-model";

pub const PASS: &str = r#"{"status": "Pass", "message": "Looks good."}"#;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Replays queued replies per model; once a queue runs dry the model's fallback
/// reply (if any) is returned on every further call.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Arc<RwLock<HashMap<String, VecDeque<String>>>>,
    fallbacks: Arc<RwLock<HashMap<String, String>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn queue(&self, model: &str, reply: &str) {
        self.replies
            .write()
            .await
            .entry(model.to_string())
            .or_default()
            .push_back(reply.to_string());
    }

    pub async fn always(&self, model: &str, reply: &str) {
        self.fallbacks
            .write()
            .await
            .insert(model.to_string(), reply.to_string());
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    pub async fn calls_to(&self, model: &str) -> Vec<RecordedCall> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.model == model)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        _temperature: f32,
        _max_output_tokens: u32,
    ) -> AppResult<String> {
        self.calls.write().await.push(RecordedCall {
            model: model.to_string(),
            messages: messages.to_vec(),
        });

        if let Some(reply) = self
            .replies
            .write()
            .await
            .get_mut(model)
            .and_then(VecDeque::pop_front)
        {
            return Ok(reply);
        }

        self.fallbacks
            .read()
            .await
            .get(model)
            .cloned()
            .ok_or_else(|| AppError::Provider(format!("No scripted reply for {}", model)))
    }
}

pub fn settings() -> RefinementSettings {
    RefinementSettings {
        generator: RoleSettings::new(GENERATOR_MODEL, 0.5, 2000),
        validator: RoleSettings::new(VALIDATOR_MODEL, 0.1, 2000),
        format: RoleSettings::new(FORMAT_MODEL, 0.0, 2000),
        ..RefinementSettings::default()
    }
}

pub fn pricing() -> PricingTable {
    let mut table = PricingTable::empty();
    for model in [GENERATOR_MODEL, VALIDATOR_MODEL, FORMAT_MODEL] {
        table
            .register(model, ModelPrice::per_thousand(0.01, 0.03))
            .expect("test prices are positive");
    }
    table
}

pub fn engine(provider: Arc<ScriptedProvider>, settings: RefinementSettings) -> RefinementEngine {
    RefinementEngine::new(
        provider,
        pricing(),
        TokenCounter::new().expect("tokenizer should load"),
        settings,
    )
}

pub fn test_figure() -> FigureRecord {
    FigureRecord::new(
        "Figure 18b",
        "bowel-perforation",
        "/images/bowel-perforation/fig18b.gif",
        "Axial CT image shows a thin linear bone fragment traversing the wall of a jejunal loop, consistent with fish-bone perforation.",
    )
}

pub fn sample_corpus() -> CorpusFile {
    CorpusFile {
        figures: vec![
            test_figure(),
            FigureRecord::new(
                "Figure 3",
                "glioblastoma",
                "/images/glioblastoma/fig3.gif",
                "Contrast-enhanced T1 image shows a ring-enhancing mass crossing the corpus callosum.",
            ),
        ],
        chunks: vec![
            ArticleChunkRecord::new(
                "bowel-perforation",
                2,
                "CT shows a linear hyperattenuating bone with adjacent fat stranding.",
            ),
            ArticleChunkRecord::new(
                "bowel-perforation",
                0,
                "Ingested foreign bodies such as a fish bone rarely cause perforation.",
            ),
            ArticleChunkRecord::new(
                "bowel-perforation",
                1,
                "Perforation of a jejunal loop is most common at angulated segments.",
            ),
            ArticleChunkRecord::new(
                "glioblastoma",
                0,
                "Glioblastoma typically shows thick irregular ring enhancement.",
            ),
        ],
    }
}

/// An MCQ answer comfortably above the long-form token minimum.
pub fn long_mcq_answer() -> String {
    "B) Foreign body perforation. The figure shows a thin linear hyperattenuating \
     structure crossing the wall of a small-bowel loop with surrounding fat stranding \
     and a small amount of free air, which together indicate perforation by an ingested \
     sharp foreign body such as a fish bone rather than obstruction, ischemia or an \
     inflammatory process, none of which produce a linear dense structure traversing the wall."
        .to_string()
}
