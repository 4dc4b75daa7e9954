//! The streamed patient reply.
//!
//! [`ConversationRelay::open`] assembles the prompt, checks the context
//! budget and spawns a producer task that owns the upstream stream. The
//! producer forwards deltas as [`RelayFrame`]s, sends the done frame and then
//! persists the exchange as a [`TranscriptWrite`]. It runs to completion
//! whether or not anyone is still reading the frames.

use std::sync::Arc;
use std::time::Instant;

use clinisim_audit::events::{AuditAction, AuditEvent};
use clinisim_core::models::case::Case;
use clinisim_core::models::session::Session;
use clinisim_core::models::turn::Turn;
use clinisim_llm::budget::{ContextBudget, TokenEstimator};
use clinisim_llm::client::{ChatBackend, CompletionRequest};
use clinisim_llm::error::LlmError;
use clinisim_llm::prompt;
use clinisim_storage::Store;
use clinisim_storage::error::StorageError;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Marker written after the last frame of every stream.
pub const DONE_SENTINEL: &str = "[DONE]";

const FRAME_BUFFER: usize = 64;

/// One event of a reply stream.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayFrame {
    Content(String),
    Done { latency_ms: u64 },
    Error(String),
}

impl RelayFrame {
    /// The JSON object carried by this frame on the wire.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            RelayFrame::Content(content) => json!({ "content": content, "done": false }),
            RelayFrame::Done { latency_ms } => {
                json!({ "content": "", "done": true, "latency_ms": latency_ms })
            }
            RelayFrame::Error(message) => json!({ "error": message }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RelayFrame::Content(_))
    }
}

pub type FrameStream = mpsc::Receiver<RelayFrame>;

#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    pub window: u32,
    pub max_reply_tokens: u32,
    pub min_reply_tokens: u32,
    pub temperature: f32,
    /// Most recent transcript turns included in the prompt.
    pub history_turns: usize,
}

impl RelaySettings {
    pub fn budget(&self) -> ContextBudget {
        ContextBudget {
            window: self.window,
            max_reply_tokens: self.max_reply_tokens,
            min_reply_tokens: self.min_reply_tokens,
        }
    }
}

/// One exchange to append to a transcript: the learner's utterance and the
/// patient's complete reply, written together.
#[derive(Debug, Clone)]
pub struct TranscriptWrite {
    pub session_id: Uuid,
    pub owner: String,
    pub turns: [Turn; 2],
}

impl TranscriptWrite {
    pub fn new(
        session: &Session,
        estimator: &TokenEstimator,
        utterance: &str,
        reply: &str,
        latency_ms: u64,
    ) -> Self {
        Self {
            session_id: session.id,
            owner: session.owner.clone(),
            turns: [
                Turn::learner(session.id, utterance, estimator.count_text(utterance)),
                Turn::patient(session.id, reply, estimator.count_text(reply), latency_ms),
            ],
        }
    }

    pub async fn commit(&self, store: &dyn Store) -> Result<(), StorageError> {
        store.append_turns(self.session_id, &self.turns).await?;
        AuditEvent::new(
            AuditAction::TurnPersisted,
            "session",
            self.session_id,
            self.owner.as_str(),
        )
        .with_details(json!({
            "learner_tokens": self.turns[0].tokens,
            "patient_tokens": self.turns[1].tokens,
            "latency_ms": self.turns[1].latency_ms,
        }))
        .emit();
        Ok(())
    }

    /// Commit, logging instead of returning a failure. The reply has
    /// already been delivered by the time this runs.
    pub async fn commit_logged(&self, store: &dyn Store) {
        if let Err(e) = self.commit(store).await {
            error!(session_id = %self.session_id, error = %e, "failed to persist transcript");
        }
    }
}

pub struct ConversationRelay {
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn Store>,
    estimator: TokenEstimator,
    settings: RelaySettings,
}

impl ConversationRelay {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn Store>,
        estimator: TokenEstimator,
        settings: RelaySettings,
    ) -> Self {
        Self {
            backend,
            store,
            estimator,
            settings,
        }
    }

    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    /// Build the completion request for the next reply, or fail with
    /// `ContextExhausted` when too little of the window is left.
    pub fn request(
        &self,
        case: &Case,
        history: &[Turn],
        utterance: &str,
    ) -> Result<CompletionRequest, LlmError> {
        let messages =
            prompt::conversation(case, history, self.settings.history_turns, utterance);
        let prompt_tokens = self.estimator.count_messages(&messages);
        let max_tokens = self.settings.budget().ceiling(prompt_tokens)?;
        debug!(prompt_tokens, max_tokens, "reply budget");
        Ok(CompletionRequest {
            messages,
            temperature: self.settings.temperature,
            max_tokens,
            json_object: false,
        })
    }

    /// Stream the patient's reply to `utterance`.
    pub fn open(
        &self,
        session: &Session,
        case: &Case,
        history: &[Turn],
        utterance: &str,
    ) -> FrameStream {
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);

        let request = match self.request(case, history, utterance) {
            Ok(request) => request,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "reply not attempted");
                let notice = match e {
                    LlmError::ContextExhausted { .. } => {
                        "This conversation has used the whole context window. Submit a diagnosis or start a new session.".to_string()
                    }
                    other => other.to_string(),
                };
                // A fresh channel always has room for one frame.
                let _ = tx.try_send(RelayFrame::Error(notice));
                return rx;
            }
        };

        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let estimator = self.estimator.clone();
        let session = session.clone();
        let utterance = utterance.to_string();

        tokio::spawn(async move {
            let started = Instant::now();
            let reply = match forward(backend.as_ref(), &request, &tx).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "reply stream failed");
                    let _ = tx.send(RelayFrame::Error(e.to_string())).await;
                    return;
                }
            };
            let latency_ms = started.elapsed().as_millis() as u64;
            let _ = tx.send(RelayFrame::Done { latency_ms }).await;

            if reply.is_empty() {
                debug!(session_id = %session.id, "empty reply, transcript unchanged");
                return;
            }
            info!(session_id = %session.id, latency_ms, chars = reply.len(), "reply complete");
            TranscriptWrite::new(&session, &estimator, &utterance, &reply, latency_ms)
                .commit_logged(store.as_ref())
                .await;
        });

        rx
    }

    /// Deliver a reply that was produced locally, through the same frame
    /// protocol, and persist it like a model reply.
    pub fn canned(&self, session: &Session, utterance: &str, reply: String) -> FrameStream {
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        let store = Arc::clone(&self.store);
        let write = TranscriptWrite::new(session, &self.estimator, utterance, &reply, 0);

        tokio::spawn(async move {
            let _ = tx.send(RelayFrame::Content(reply)).await;
            let _ = tx.send(RelayFrame::Done { latency_ms: 0 }).await;
            write.commit_logged(store.as_ref()).await;
        });

        rx
    }
}

/// Forward deltas until the upstream stream ends, returning the full reply.
/// Send failures mean the reader went away; generation continues anyway.
async fn forward(
    backend: &dyn ChatBackend,
    request: &CompletionRequest,
    tx: &mpsc::Sender<RelayFrame>,
) -> Result<String, LlmError> {
    let mut deltas = backend.stream(request).await?;
    let mut reply = String::new();
    while let Some(delta) = deltas.recv().await {
        let text = delta?;
        if text.is_empty() {
            continue;
        }
        reply.push_str(&text);
        let _ = tx.send(RelayFrame::Content(text)).await;
    }
    Ok(reply)
}
