//! Token estimation and generation ceilings for a fixed context window.

use std::path::Path;
use std::sync::Arc;

use crate::client::ChatMessage;
use crate::error::LlmError;

/// Per-message framing overhead added on top of content tokens.
const MESSAGE_OVERHEAD: u32 = 4;

/// Estimates token counts for prompt messages and replies.
#[derive(Clone)]
pub enum TokenEstimator {
    /// Character heuristic: three ASCII characters or one other character
    /// per token, rounded up. Errs high for both Latin and CJK text.
    Heuristic,
    /// The served model's own tokenizer.
    Tokenizer(Arc<tokenizers::Tokenizer>),
}

impl std::fmt::Debug for TokenEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenEstimator::Heuristic => f.write_str("Heuristic"),
            TokenEstimator::Tokenizer(_) => f.write_str("Tokenizer"),
        }
    }
}

impl TokenEstimator {
    /// Load a `tokenizer.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LlmError> {
        let tokenizer = tokenizers::Tokenizer::from_file(path.as_ref())
            .map_err(|e| LlmError::Tokenizer(e.to_string()))?;
        Ok(TokenEstimator::Tokenizer(Arc::new(tokenizer)))
    }

    /// Tokens in a piece of text; at least 1 for non-empty text.
    pub fn count_text(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        let count = match self {
            TokenEstimator::Heuristic => heuristic_tokens(text),
            TokenEstimator::Tokenizer(tokenizer) => match tokenizer.encode(text, false) {
                Ok(encoding) => encoding.len() as u32,
                Err(e) => {
                    tracing::warn!(error = %e, "tokenizer failed, using heuristic");
                    heuristic_tokens(text)
                }
            },
        };
        count.max(1)
    }

    /// Tokens for a whole prompt, including per-message overhead.
    pub fn count_messages(&self, messages: &[ChatMessage]) -> u32 {
        messages
            .iter()
            .map(|m| self.count_text(&m.content) + MESSAGE_OVERHEAD)
            .sum()
    }
}

fn heuristic_tokens(text: &str) -> u32 {
    let (ascii, other) = text.chars().fold((0u32, 0u32), |(a, o), c| {
        if c.is_ascii() { (a + 1, o) } else { (a, o + 1) }
    });
    ascii.div_ceil(3) + other
}

/// A fixed context window and the reply sizes allowed within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    pub window: u32,
    pub max_reply_tokens: u32,
    pub min_reply_tokens: u32,
}

impl ContextBudget {
    pub fn remaining(&self, prompt_tokens: u32) -> u32 {
        self.window.saturating_sub(prompt_tokens)
    }

    /// Reply ceiling for a prompt, or `ContextExhausted` when fewer than
    /// `min_reply_tokens` remain.
    pub fn ceiling(&self, prompt_tokens: u32) -> Result<u32, LlmError> {
        let remaining = self.remaining(prompt_tokens);
        if remaining < self.min_reply_tokens {
            return Err(LlmError::ContextExhausted {
                prompt_tokens,
                window: self.window,
            });
        }
        Ok(self.max_reply_tokens.min(remaining))
    }

    /// Ceiling that never drops below `floor`, even when the prompt fills
    /// the window. The call is still attempted so the failure surfaces from
    /// the model.
    pub fn floored_ceiling(&self, prompt_tokens: u32, cap: u32, floor: u32) -> u32 {
        cap.min(self.remaining(prompt_tokens)).max(floor)
    }
}

/// The most recent `keep` items of a history.
pub fn recent<T>(history: &[T], keep: usize) -> &[T] {
    &history[history.len().saturating_sub(keep)..]
}
