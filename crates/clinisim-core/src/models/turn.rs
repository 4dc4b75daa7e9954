use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TurnRole {
    /// The learner, playing the doctor.
    Learner,
    /// The simulated patient.
    Patient,
}

/// One transcript entry. Turns are ordered by `created_at` within a session.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Turn {
    pub session_id: Uuid,
    pub role: TurnRole,
    pub content: String,
    /// Estimated token count of `content`.
    pub tokens: u32,
    /// Time to complete the reply; patient turns only.
    pub latency_ms: Option<u64>,
    pub created_at: jiff::Timestamp,
}

impl Turn {
    pub fn learner(session_id: Uuid, content: impl Into<String>, tokens: u32) -> Self {
        Self {
            session_id,
            role: TurnRole::Learner,
            content: content.into(),
            tokens,
            latency_ms: None,
            created_at: jiff::Timestamp::now(),
        }
    }

    pub fn patient(
        session_id: Uuid,
        content: impl Into<String>,
        tokens: u32,
        latency_ms: u64,
    ) -> Self {
        Self {
            session_id,
            role: TurnRole::Patient,
            content: content.into(),
            tokens,
            latency_ms: Some(latency_ms),
            created_at: jiff::Timestamp::now(),
        }
    }
}
