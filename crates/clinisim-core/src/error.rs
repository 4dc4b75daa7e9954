use thiserror::Error;

use crate::models::session::SessionStatus;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("illegal session transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("unknown investigation type: {0}")]
    UnknownInvestigation(String),

    #[error("unknown disease identifier: {0}")]
    UnknownDisease(String),
}
