//! clinisim-llm
//!
//! OpenAI-compatible chat completion client, context budgeting, prompt
//! construction and the case synthesis pipeline.

pub mod budget;
pub mod client;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod sse;
pub mod synth;
