use clinisim_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model request timed out")]
    Timeout,

    #[error("model connection failed: {0}")]
    Connection(String),

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model response malformed: {0}")]
    Malformed(String),

    #[error("context window exhausted: prompt needs {prompt_tokens} of {window} tokens")]
    ContextExhausted { prompt_tokens: u32, window: u32 },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl LlmError {
    /// Timeouts map to a gateway timeout; every other upstream failure is a
    /// bad gateway.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LlmError::Timeout)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::Malformed(e.to_string())
        } else {
            LlmError::Connection(e.to_string())
        }
    }
}
