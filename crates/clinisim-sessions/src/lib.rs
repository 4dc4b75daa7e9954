//! clinisim-sessions
//!
//! The encounter itself: session lifecycle, the streamed patient relay,
//! investigation ordering and submission. Everything here is orchestration
//! over [`clinisim_storage::Store`] and [`clinisim_llm::client::ChatBackend`].

pub mod error;
pub mod import;
pub mod intents;
pub mod lifecycle;
pub mod relay;
