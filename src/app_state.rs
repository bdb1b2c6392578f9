use std::sync::Arc;

use crate::{
    config::Config,
    errors::AppResult,
    repositories::CorpusIndex,
    services::{
        context_assembler::ContextAssembler,
        model_service::{LlmProvider, OpenAiModelService},
        pricing::PricingTable,
        question_bank_service::{BankOptions, GenerationSession, QbankService, QuestionBank},
        refinement_engine::{RefinementEngine, RefinementSettings},
        sampler::WeightParams,
        token_counter::TokenCounter,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub index: Arc<dyn CorpusIndex>,
    pub qbank_service: Arc<QbankService>,
}

impl AppState {
    pub fn new(config: Config, index: Arc<dyn CorpusIndex>) -> AppResult<Self> {
        let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiModelService::new(&config));
        Self::with_provider(config, index, provider, PricingTable::with_defaults())
    }

    pub fn with_provider(
        config: Config,
        index: Arc<dyn CorpusIndex>,
        provider: Arc<dyn LlmProvider>,
        pricing: PricingTable,
    ) -> AppResult<Self> {
        config.check()?;

        let assembler = ContextAssembler::new(index.clone(), config.num_retrieved_chunks)?;
        let engine = RefinementEngine::new(
            provider,
            pricing,
            TokenCounter::new()?,
            RefinementSettings::from_config(&config),
        );
        let qbank_service = Arc::new(QbankService::new(assembler, engine));

        Ok(Self {
            config: Arc::new(config),
            index,
            qbank_service,
        })
    }

    /// Opens a session over the figures of `selected_articles` (all when `None`),
    /// weighted towards `topic` when one is given.
    pub async fn new_session(
        &self,
        topic: Option<&str>,
        selected_articles: Option<Vec<String>>,
    ) -> AppResult<GenerationSession> {
        let mut options = BankOptions {
            weights: WeightParams {
                exponent: self.config.weight_exponent,
                epsilon: self.config.weight_epsilon,
            },
            ..BankOptions::default()
        };
        if let Some(topic) = topic {
            options = options.with_topic(topic);
        }
        if let Some(articles) = selected_articles {
            options = options.with_articles(articles);
        }

        let bank = QuestionBank::setup(self.index.as_ref(), &options).await?;
        GenerationSession::new(
            bank,
            self.config.max_questions_per_figure,
            self.config.selection_attempt_limit,
        )
    }
}
