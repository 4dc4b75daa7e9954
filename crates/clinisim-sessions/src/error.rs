use clinisim_core::error::CoreError;
use clinisim_llm::error::LlmError;
use clinisim_storage::error::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("session belongs to another user")]
    Forbidden,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("context window exhausted: prompt needs {prompt_tokens} of {window} tokens")]
    ContextExhausted { prompt_tokens: u32, window: u32 },

    #[error("model request timed out")]
    UpstreamTimeout,

    #[error("model unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("model response malformed: {0}")]
    UpstreamMalformed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for SessionError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { key } => SessionError::NotFound(key),
            StorageError::Conflict { key } => SessionError::Conflict(key),
            StorageError::Core(core) => core.into(),
            other => SessionError::Storage(other),
        }
    }
}

impl From<CoreError> for SessionError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidTransition { .. } => SessionError::InvalidState(e.to_string()),
            CoreError::UnknownInvestigation(code) => {
                SessionError::InvalidInput(format!("unknown investigation type: {code}"))
            }
            CoreError::UnknownDisease(id) => SessionError::NotFound(format!("disease {id}")),
        }
    }
}

impl From<LlmError> for SessionError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout => SessionError::UpstreamTimeout,
            LlmError::Malformed(msg) => SessionError::UpstreamMalformed(msg),
            LlmError::ContextExhausted {
                prompt_tokens,
                window,
            } => SessionError::ContextExhausted {
                prompt_tokens,
                window,
            },
            LlmError::Core(core) => core.into(),
            other => SessionError::UpstreamUnavailable(other.to_string()),
        }
    }
}
