use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    #[error("Provider decode error: {0}")]
    ProviderDecode(String),

    #[error("Format repair exhausted after {attempts} attempts")]
    FormatExhausted { attempts: u32 },

    #[error("Exceeded {rounds} revision rounds; last validator message: {last_message}")]
    RevisionExhausted { rounds: u32, last_message: String },

    #[error("Selection exhausted after {attempts} attempts")]
    SelectionExhausted { attempts: usize },

    #[error("Unknown pricing model: {0}")]
    UnknownPricingModel(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Corpus index error: {0}")]
    Index(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ProviderDecode(_) => "PROVIDER_DECODE",
            AppError::FormatExhausted { .. } => "FORMAT_EXHAUSTED",
            AppError::RevisionExhausted { .. } => "REVISION_EXHAUSTED",
            AppError::SelectionExhausted { .. } => "SELECTION_EXHAUSTED",
            AppError::UnknownPricingModel(_) => "UNKNOWN_PRICING_MODEL",
            AppError::Provider(_) => "PROVIDER_ERROR",
            AppError::Index(_) => "INDEX_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
        }
    }

    /// Whether the error came out of one of the bounded refinement loops.
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            AppError::FormatExhausted { .. }
                | AppError::RevisionExhausted { .. }
                | AppError::SelectionExhausted { .. }
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            error: err.to_string(),
            code: err.code(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError(format!("JSON error: {}", err))
    }
}
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
impl From<async_openai::error::OpenAIError> for AppError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        AppError::Provider(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
