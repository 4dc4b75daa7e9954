use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;

/// Lifecycle state of a session. `InProgress` is initial, `Submitted` is
/// terminal; the only legal transition is `InProgress -> Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SessionStatus {
    InProgress,
    Submitted,
}

impl SessionStatus {
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::InProgress, SessionStatus::Submitted)
        )
    }

    pub fn transition(self, next: SessionStatus) -> Result<SessionStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SessionStatus::Submitted
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::InProgress => f.write_str("in_progress"),
            SessionStatus::Submitted => f.write_str("submitted"),
        }
    }
}

/// One learner's encounter with one case.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Session {
    pub id: Uuid,
    pub owner: String,
    pub case_id: Uuid,
    pub status: SessionStatus,
    pub submitted_diagnosis: Option<String>,
    pub started_at: jiff::Timestamp,
    pub ended_at: Option<jiff::Timestamp>,
}

impl Session {
    pub fn new(owner: impl Into<String>, case_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            case_id,
            status: SessionStatus::InProgress,
            submitted_diagnosis: None,
            started_at: jiff::Timestamp::now(),
            ended_at: None,
        }
    }

    /// Apply the submission transition, recording the diagnosis and end time.
    pub fn submit(
        &mut self,
        diagnosis: impl Into<String>,
        at: jiff::Timestamp,
    ) -> Result<(), CoreError> {
        self.status = self.status.transition(SessionStatus::Submitted)?;
        self.submitted_diagnosis = Some(diagnosis.into());
        self.ended_at = Some(at);
        Ok(())
    }
}
