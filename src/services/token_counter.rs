use std::sync::Arc;

use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::{
    errors::{AppError, AppResult},
    services::model_service::ChatMessage,
};

/// cl100k tokenizer shared by cost accounting and the answer-length checks.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TokenCounter {
    pub fn new() -> AppResult<Self> {
        let bpe = cl100k_base()
            .map_err(|e| AppError::Config(format!("Failed to load cl100k tokenizer: {}", e)))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Tokens of all message contents; role framing is not counted.
    pub fn count_messages(&self, messages: &[ChatMessage]) -> usize {
        messages.iter().map(|m| self.count(&m.content)).sum()
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").finish_non_exhaustive()
    }
}
