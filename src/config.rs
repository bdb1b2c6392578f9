use std::env;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use validator::Validate;

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, Validate)]
pub struct Config {
    pub openai_api_key: SecretString,
    pub openai_base_url: Option<String>,
    #[validate(length(min = 1))]
    pub generator_model: String,
    #[validate(length(min = 1))]
    pub validator_model: String,
    #[validate(length(min = 1))]
    pub format_model: String,
    #[validate(range(min = 0.0, max = 2.0))]
    pub generator_temperature: f32,
    #[validate(range(min = 0.0, max = 2.0))]
    pub validator_temperature: f32,
    #[validate(range(min = 0.0, max = 2.0))]
    pub format_temperature: f32,
    #[validate(range(min = 1))]
    pub max_output_tokens: u32,
    #[validate(range(min = 1, max = 100))]
    pub max_rounds: u32,
    #[validate(range(min = 1, max = 50))]
    pub max_format_retries: u32,
    #[validate(range(min = 1))]
    pub num_retrieved_chunks: usize,
    #[validate(range(min = 1))]
    pub max_questions_per_figure: u32,
    #[validate(range(min = 1))]
    pub selection_attempt_limit: usize,
    #[validate(range(min = 1.0))]
    pub weight_exponent: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub weight_epsilon: f64,
    pub min_long_answer_tokens: usize,
    pub max_short_answer_tokens: usize,
    pub corpus_path: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: SecretString::from(env::var("OPENAI_API_KEY").unwrap_or_default()),
            openai_base_url: env::var("OPENAI_BASE_URL").ok().filter(|v| !v.is_empty()),
            generator_model: env::var("GENERATOR_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
            validator_model: env::var("VALIDATOR_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
            format_model: env::var("FORMAT_MODEL")
                .unwrap_or_else(|_| "gpt-3.5-turbo-1106".to_string()),
            generator_temperature: env_or("GENERATOR_TEMPERATURE", 0.5),
            validator_temperature: env_or("VALIDATOR_TEMPERATURE", 0.1),
            format_temperature: env_or("FORMAT_TEMPERATURE", 0.0),
            max_output_tokens: env_or("MAX_OUTPUT_TOKENS", 2000),
            max_rounds: env_or("MAX_ROUNDS", 10),
            max_format_retries: env_or("MAX_FORMAT_RETRIES", 5),
            num_retrieved_chunks: env_or("NUM_RETRIEVED_CHUNKS", 3),
            max_questions_per_figure: env_or("MAX_QUESTIONS_PER_FIGURE", 1),
            selection_attempt_limit: env_or("SELECTION_ATTEMPT_LIMIT", 10_000),
            weight_exponent: env_or("WEIGHT_EXPONENT", 50.0),
            weight_epsilon: env_or("WEIGHT_EPSILON", 1e-6),
            min_long_answer_tokens: env_or("MIN_LONG_ANSWER_TOKENS", 50),
            max_short_answer_tokens: env_or("MAX_SHORT_ANSWER_TOKENS", 50),
            corpus_path: env::var("CORPUS_PATH")
                .unwrap_or_else(|_| "data/corpus.json".to_string()),
        }
    }

    /// Range checks on every numeric knob, reported as a configuration error.
    pub fn check(&self) -> AppResult<()> {
        self.validate()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// Rejects configurations that cannot reach a real provider.
    pub fn validate_for_production(&self) -> AppResult<()> {
        self.check()?;

        let api_key = self.openai_api_key.expose_secret();
        if api_key.trim().is_empty() {
            return Err(AppError::Config(
                "OPENAI_API_KEY is not set. Export it or add it to .env.".to_string(),
            ));
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            openai_api_key: SecretString::from("test-key".to_string()),
            openai_base_url: None,
            generator_model: "gen-model".to_string(),
            validator_model: "val-model".to_string(),
            format_model: "fmt-model".to_string(),
            generator_temperature: 0.5,
            validator_temperature: 0.1,
            format_temperature: 0.0,
            max_output_tokens: 2000,
            max_rounds: 10,
            max_format_retries: 5,
            num_retrieved_chunks: 3,
            max_questions_per_figure: 1,
            selection_attempt_limit: 1_000,
            weight_exponent: 50.0,
            weight_epsilon: 1e-6,
            min_long_answer_tokens: 50,
            max_short_answer_tokens: 50,
            corpus_path: "data/corpus.json".to_string(),
        }
    }
}
