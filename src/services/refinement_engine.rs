use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::{
    config::Config,
    constants::prompts::{
        format_prompt, generator_prompt, validator_prompt, ANSWER_TOO_LONG_INSTRUCTION,
        ANSWER_TOO_SHORT_INSTRUCTION, FIGURE_NUMBER_INSTRUCTION, FORMAT_SYSTEM_PROMPT,
        GENERATOR_SYSTEM_PROMPT, VALIDATOR_SYSTEM_PROMPT,
    },
    errors::{AppError, AppResult},
    models::domain::{FigureRecord, LengthClass, QaArtifact, QuestionType, ValidatorVerdict},
    services::{
        model_service::{AgentRole, ChatMessage, LlmProvider, RoleSettings},
        output_decoder::{decode_draft, decode_verdict, draft_schema},
        pricing::PricingTable,
        token_counter::TokenCounter,
    },
};

pub const DEFAULT_MAX_ROUNDS: u32 = 10;
pub const DEFAULT_MAX_FORMAT_RETRIES: u32 = 5;
pub const DEFAULT_ANSWER_TOKEN_THRESHOLD: usize = 50;

static FIGURE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfig(?:ure)?\.?\s*\d+[a-z]?\b").expect("FIGURE_NUMBER is a valid regex pattern")
});

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementSettings {
    pub generator: RoleSettings,
    pub validator: RoleSettings,
    pub format: RoleSettings,
    pub max_rounds: u32,
    pub max_format_retries: u32,
    pub min_long_answer_tokens: usize,
    pub max_short_answer_tokens: usize,
}

impl RefinementSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            generator: RoleSettings::new(
                &config.generator_model,
                config.generator_temperature,
                config.max_output_tokens,
            ),
            validator: RoleSettings::new(
                &config.validator_model,
                config.validator_temperature,
                config.max_output_tokens,
            ),
            format: RoleSettings::new(
                &config.format_model,
                config.format_temperature,
                config.max_output_tokens,
            ),
            max_rounds: config.max_rounds,
            max_format_retries: config.max_format_retries,
            min_long_answer_tokens: config.min_long_answer_tokens,
            max_short_answer_tokens: config.max_short_answer_tokens,
        }
    }

    fn role(&self, role: AgentRole) -> &RoleSettings {
        match role {
            AgentRole::Generator => &self.generator,
            AgentRole::Validator => &self.validator,
            AgentRole::Format => &self.format,
        }
    }
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self {
            generator: RoleSettings::new("gpt-4", 0.5, 2000),
            validator: RoleSettings::new("gpt-4", 0.1, 2000),
            format: RoleSettings::new("gpt-3.5-turbo-1106", 0.0, 2000),
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_format_retries: DEFAULT_MAX_FORMAT_RETRIES,
            min_long_answer_tokens: DEFAULT_ANSWER_TOKEN_THRESHOLD,
            max_short_answer_tokens: DEFAULT_ANSWER_TOKEN_THRESHOLD,
        }
    }
}

/// The figure a question is written for, with its assembled article context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemContext {
    pub figure: FigureRecord,
    pub context: String,
}

impl ItemContext {
    pub fn new(figure: FigureRecord, context: String) -> Self {
        Self { figure, context }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementStep {
    Generating,
    FormatRepair,
    Validating,
    Passed,
    Revising,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Prompt,
    Response,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub round: u32,
    pub role: AgentRole,
    pub kind: EntryKind,
    pub text: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} > {}", self.role, self.text)
    }
}

/// Per-call state; dropped when `generate_qa` returns.
#[derive(Debug)]
pub struct RefinementState {
    pub round_count: u32,
    pub format_retry_count: u32,
    pub conversation_log: Vec<LogEntry>,
    pub accumulated_cost: f64,
    pub cost_history: Vec<f64>,
    pub last_generator_output: Option<String>,
    pub last_validator_verdict: Option<ValidatorVerdict>,
    pub step: RefinementStep,
}

impl RefinementState {
    fn new() -> Self {
        Self {
            round_count: 0,
            format_retry_count: 0,
            conversation_log: Vec::new(),
            accumulated_cost: 0.0,
            cost_history: Vec::new(),
            last_generator_output: None,
            last_validator_verdict: None,
            step: RefinementStep::Generating,
        }
    }

    fn record(&mut self, role: AgentRole, kind: EntryKind, text: impl Into<String>) {
        self.conversation_log.push(LogEntry {
            round: self.round_count,
            role,
            kind,
            text: text.into(),
        });
    }

    fn transition(&mut self, step: RefinementStep) {
        log::debug!("Round {}: {:?} -> {:?}", self.round_count, self.step, step);
        self.step = step;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefinementOutcome {
    pub artifact: QaArtifact,
    pub accumulated_cost: f64,
    pub conversation_log: Vec<LogEntry>,
    pub rounds: u32,
    pub format_retries: u32,
    /// Running total after each model call.
    pub cost_history: Vec<f64>,
}

/// A fatal refinement failure with everything spent and said up to that point.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RefinementError {
    #[source]
    pub error: AppError,
    pub conversation_log: Vec<LogEntry>,
    pub accumulated_cost: f64,
    pub rounds: u32,
}

impl From<AppError> for RefinementError {
    fn from(error: AppError) -> Self {
        Self {
            error,
            conversation_log: Vec::new(),
            accumulated_cost: 0.0,
            rounds: 0,
        }
    }
}

pub struct RefinementEngine {
    provider: Arc<dyn LlmProvider>,
    pricing: PricingTable,
    tokens: TokenCounter,
    settings: RefinementSettings,
}

impl RefinementEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        pricing: PricingTable,
        tokens: TokenCounter,
        settings: RefinementSettings,
    ) -> Self {
        Self {
            provider,
            pricing,
            tokens,
            settings,
        }
    }

    pub fn settings(&self) -> &RefinementSettings {
        &self.settings
    }

    /// Runs generator, format repair and validator until the validator passes a
    /// draft or one of the bounded loops gives up.
    pub async fn generate_qa(
        &self,
        item: &ItemContext,
        question_type: QuestionType,
    ) -> Result<RefinementOutcome, RefinementError> {
        let resolved = {
            let mut rng = rand::thread_rng();
            question_type.resolve(&mut rng)
        };
        if resolved != question_type {
            log::info!("{} resolved to {} for {}", question_type, resolved, item.figure.figure_id);
        }

        let mut state = RefinementState::new();
        match self.run(item, resolved, &mut state).await {
            Ok(artifact) => {
                log::info!(
                    "Question for {} accepted after {} round(s), cost ${:.4}",
                    item.figure.figure_id,
                    state.round_count,
                    state.accumulated_cost
                );
                Ok(RefinementOutcome {
                    artifact,
                    accumulated_cost: state.accumulated_cost,
                    conversation_log: state.conversation_log,
                    rounds: state.round_count,
                    format_retries: state.format_retry_count,
                    cost_history: state.cost_history,
                })
            }
            Err(error) => {
                log::warn!(
                    "Refinement for {} failed during {:?} in round {}: {}",
                    item.figure.figure_id,
                    state.step,
                    state.round_count,
                    error
                );
                Err(RefinementError {
                    error,
                    conversation_log: state.conversation_log,
                    accumulated_cost: state.accumulated_cost,
                    rounds: state.round_count,
                })
            }
        }
    }

    async fn run(
        &self,
        item: &ItemContext,
        question_type: QuestionType,
        state: &mut RefinementState,
    ) -> AppResult<QaArtifact> {
        let prompt = generator_prompt(&item.figure, &item.context, question_type);
        let mut generator_messages = vec![
            ChatMessage::system(GENERATOR_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];
        let mut validator_messages: Vec<ChatMessage> = Vec::new();
        let mut previous_verdict: Option<String> = None;

        loop {
            state.round_count += 1;
            state.transition(RefinementStep::Generating);
            log::info!(
                "Round {}/{} for {} ({})",
                state.round_count,
                self.settings.max_rounds,
                item.figure.figure_id,
                question_type
            );

            if let Some(latest) = generator_messages.last() {
                state.record(AgentRole::Generator, EntryKind::Prompt, latest.content.clone());
            }
            let raw = self
                .invoke(AgentRole::Generator, &generator_messages, state)
                .await?;
            state.record(AgentRole::Generator, EntryKind::Response, raw.clone());
            state.last_generator_output = Some(raw.clone());

            state.transition(RefinementStep::FormatRepair);
            let artifact = self.repair_format(&raw, question_type, state).await?;
            let qa_string = artifact.qa_string();
            state.record(AgentRole::Generator, EntryKind::Response, qa_string.clone());

            state.transition(RefinementStep::Validating);
            match previous_verdict.take() {
                None => {
                    validator_messages.push(ChatMessage::system(VALIDATOR_SYSTEM_PROMPT));
                    validator_messages.push(ChatMessage::user(validator_prompt(
                        &item.figure.caption_text,
                        &qa_string,
                        question_type,
                    )));
                }
                Some(verdict_raw) => {
                    validator_messages.push(ChatMessage::assistant(verdict_raw));
                    validator_messages.push(ChatMessage::user(qa_string.clone()));
                }
            }
            if let Some(latest) = validator_messages.last() {
                state.record(AgentRole::Validator, EntryKind::Prompt, latest.content.clone());
            }

            let verdict_raw = self
                .invoke(AgentRole::Validator, &validator_messages, state)
                .await?;
            state.record(AgentRole::Validator, EntryKind::Response, verdict_raw.clone());
            let mut verdict = decode_verdict(&verdict_raw)?;
            self.apply_answer_checks(&artifact, &mut verdict);

            state.record(
                AgentRole::Validator,
                EntryKind::Response,
                format!("Status: {}: {}", verdict.status, verdict.message),
            );
            state.last_validator_verdict = Some(verdict.clone());

            if verdict.is_pass() {
                state.transition(RefinementStep::Passed);
                return Ok(artifact);
            }

            if state.round_count >= self.settings.max_rounds {
                return Err(AppError::RevisionExhausted {
                    rounds: state.round_count,
                    last_message: verdict.message,
                });
            }

            state.transition(RefinementStep::Revising);
            generator_messages.push(ChatMessage::assistant(raw));
            generator_messages.push(ChatMessage::user(verdict.message));
            previous_verdict = Some(verdict_raw);
        }
    }

    /// Decodes the generator output, asking the format role to rewrite it when the
    /// direct decode fails. The generator is never re-run from here.
    async fn repair_format(
        &self,
        raw: &str,
        question_type: QuestionType,
        state: &mut RefinementState,
    ) -> AppResult<QaArtifact> {
        let mut last_error = match decode_draft(raw, question_type) {
            Ok(artifact) => return Ok(artifact),
            Err(e) => e,
        };
        let mut latest = raw.to_string();

        for attempt in 1..=self.settings.max_format_retries {
            state.format_retry_count += 1;
            log::debug!(
                "Format repair attempt {}/{}: {}",
                attempt,
                self.settings.max_format_retries,
                last_error
            );

            let prompt = format_prompt(
                &latest,
                question_type,
                &last_error.to_string(),
                draft_schema(),
            );
            state.record(AgentRole::Format, EntryKind::Prompt, prompt.clone());
            let messages = vec![
                ChatMessage::system(FORMAT_SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ];
            let repaired = self.invoke(AgentRole::Format, &messages, state).await?;
            state.record(AgentRole::Format, EntryKind::Response, repaired.clone());

            match decode_draft(&repaired, question_type) {
                Ok(artifact) => {
                    log::debug!("Repaired generator output on attempt {}", attempt);
                    return Ok(artifact);
                }
                Err(e) => {
                    log::warn!("Format repair attempt {} still undecodable: {}", attempt, e);
                    last_error = e;
                    if !repaired.trim().is_empty() {
                        latest = repaired;
                    }
                }
            }
        }

        state.record(
            AgentRole::Format,
            EntryKind::Response,
            format!("Gave up after {} attempts: {}", self.settings.max_format_retries, last_error),
        );
        Err(AppError::FormatExhausted {
            attempts: self.settings.max_format_retries,
        })
    }

    fn apply_answer_checks(&self, artifact: &QaArtifact, verdict: &mut ValidatorVerdict) {
        let answer_tokens = self.tokens.count(&artifact.answer);

        match artifact.question_type.length_class() {
            LengthClass::LongForm if answer_tokens < self.settings.min_long_answer_tokens => {
                log::debug!("Answer has {} tokens, below the long-form minimum", answer_tokens);
                verdict.force_fail(ANSWER_TOO_SHORT_INSTRUCTION);
            }
            LengthClass::ShortForm if answer_tokens > self.settings.max_short_answer_tokens => {
                log::debug!("Answer has {} tokens, above the short-form maximum", answer_tokens);
                verdict.force_fail(ANSWER_TOO_LONG_INSTRUCTION);
            }
            _ => {}
        }

        if FIGURE_NUMBER.is_match(&artifact.question) {
            verdict.force_fail(FIGURE_NUMBER_INSTRUCTION);
        }
    }

    /// One model call, priced before it is made and added to the running cost.
    async fn invoke(
        &self,
        role: AgentRole,
        messages: &[ChatMessage],
        state: &mut RefinementState,
    ) -> AppResult<String> {
        let settings = self.settings.role(role);
        let price = self.pricing.model_price(&settings.model)?;

        let output = self
            .provider
            .complete(
                messages,
                &settings.model,
                settings.temperature,
                settings.max_output_tokens,
            )
            .await?;

        let input_tokens = self.tokens.count_messages(messages);
        let output_tokens = self.tokens.count(&output);
        let cost = price.cost(input_tokens, output_tokens);
        state.accumulated_cost += cost;
        state.cost_history.push(state.accumulated_cost);

        log::debug!(
            "{} call on {}: {} in / {} out tokens, ${:.5} (total ${:.5})",
            role,
            settings.model,
            input_tokens,
            output_tokens,
            cost,
            state.accumulated_cost
        );
        Ok(output)
    }
}
