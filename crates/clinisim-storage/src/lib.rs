//! clinisim-storage
//!
//! Persistence for cases, sessions, transcripts, investigation orders and
//! score reports. [`Store`] is the seam; [`s3::S3Store`] keeps JSON documents
//! in a bucket and [`memory::MemoryStore`] keeps them in process.

pub mod client;
pub mod error;
pub mod memory;
pub mod objects;
pub mod s3;
pub mod state;

use async_trait::async_trait;
use clinisim_core::models::case::Case;
use clinisim_core::models::investigation::InvestigationOrder;
use clinisim_core::models::score::ScoreReport;
use clinisim_core::models::session::Session;
use clinisim_core::models::turn::Turn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// A session and its report, stored together so submission is one write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session: Session,
    #[serde(default)]
    pub report: Option<ScoreReport>,
}

/// Result of [`Store::commit_submission`].
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// The session moved to `submitted` together with this report.
    Committed(Session),
    /// The session was already submitted; its stored report is returned
    /// unchanged.
    AlreadySubmitted(Session, ScoreReport),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Store a new case. Existing cases are never overwritten.
    async fn put_case(&self, case: &Case) -> Result<(), StorageError>;

    async fn get_case(&self, id: Uuid) -> Result<Case, StorageError>;

    /// All cases, oldest first.
    async fn list_cases(&self) -> Result<Vec<Case>, StorageError>;

    async fn create_session(&self, session: &Session) -> Result<(), StorageError>;

    async fn get_session(&self, id: Uuid) -> Result<Session, StorageError>;

    /// Sessions belonging to `owner`, newest first.
    async fn list_sessions(&self, owner: &str) -> Result<Vec<Session>, StorageError>;

    /// Delete a session with its transcript, orders and report.
    async fn delete_session(&self, id: Uuid) -> Result<(), StorageError>;

    /// Append turns to a session's transcript, preserving their order.
    async fn append_turns(&self, session_id: Uuid, turns: &[Turn]) -> Result<(), StorageError>;

    /// The transcript in creation order.
    async fn list_turns(&self, session_id: Uuid) -> Result<Vec<Turn>, StorageError>;

    /// Record an order. A second order of the same type for the same
    /// session fails with `Conflict`.
    async fn insert_investigation(&self, order: &InvestigationOrder) -> Result<(), StorageError>;

    /// Orders in the sequence they were placed.
    async fn list_investigations(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<InvestigationOrder>, StorageError>;

    /// Atomically mark the session submitted and attach its report. A
    /// session that is already submitted is left untouched.
    async fn commit_submission(
        &self,
        session_id: Uuid,
        diagnosis: &str,
        report: &ScoreReport,
    ) -> Result<SubmissionOutcome, StorageError>;

    async fn get_report(&self, session_id: Uuid) -> Result<Option<ScoreReport>, StorageError>;
}

/// Apply a submission to a loaded record, or report that it already
/// happened. Shared by every store implementation.
pub(crate) fn apply_submission(
    record: &mut SessionRecord,
    diagnosis: &str,
    report: &ScoreReport,
) -> Result<Option<SubmissionOutcome>, StorageError> {
    if record.session.status.is_terminal() {
        let existing = record.report.clone().ok_or_else(|| StorageError::NotFound {
            key: clinisim_core::keys::session(record.session.id),
        })?;
        return Ok(Some(SubmissionOutcome::AlreadySubmitted(
            record.session.clone(),
            existing,
        )));
    }
    record.session.submit(diagnosis, report.scored_at)?;
    record.report = Some(report.clone());
    Ok(None)
}
