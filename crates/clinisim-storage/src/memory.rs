use std::collections::HashMap;

use async_trait::async_trait;
use clinisim_core::keys;
use clinisim_core::models::case::Case;
use clinisim_core::models::investigation::InvestigationOrder;
use clinisim_core::models::score::ScoreReport;
use clinisim_core::models::session::Session;
use clinisim_core::models::turn::Turn;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StorageError;
use crate::{SessionRecord, Store, SubmissionOutcome, apply_submission};

/// In-process store with the same semantics as the S3 store. Used for local
/// runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    cases: HashMap<Uuid, Case>,
    sessions: HashMap<Uuid, SessionRecord>,
    transcripts: HashMap<Uuid, Vec<Turn>>,
    investigations: HashMap<Uuid, Vec<InvestigationOrder>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn session_missing(id: Uuid) -> StorageError {
    StorageError::NotFound {
        key: keys::session(id),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put_case(&self, case: &Case) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        if inner.cases.contains_key(&case.id) {
            return Err(StorageError::Conflict {
                key: keys::case(case.id),
            });
        }
        inner.cases.insert(case.id, case.clone());
        Ok(())
    }

    async fn get_case(&self, id: Uuid) -> Result<Case, StorageError> {
        self.inner
            .lock()
            .await
            .cases
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: keys::case(id),
            })
    }

    async fn list_cases(&self) -> Result<Vec<Case>, StorageError> {
        let mut cases: Vec<Case> = self.inner.lock().await.cases.values().cloned().collect();
        cases.sort_by_key(|c| (c.created_at, c.id));
        Ok(cases)
    }

    async fn create_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        if inner.sessions.contains_key(&session.id) {
            return Err(StorageError::Conflict {
                key: keys::session(session.id),
            });
        }
        inner.sessions.insert(
            session.id,
            SessionRecord {
                session: session.clone(),
                report: None,
            },
        );
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Session, StorageError> {
        self.inner
            .lock()
            .await
            .sessions
            .get(&id)
            .map(|r| r.session.clone())
            .ok_or_else(|| session_missing(id))
    }

    async fn list_sessions(&self, owner: &str) -> Result<Vec<Session>, StorageError> {
        let mut sessions: Vec<Session> = self
            .inner
            .lock()
            .await
            .sessions
            .values()
            .filter(|r| r.session.owner == owner)
            .map(|r| r.session.clone())
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        inner.sessions.remove(&id).ok_or_else(|| session_missing(id))?;
        inner.transcripts.remove(&id);
        inner.investigations.remove(&id);
        Ok(())
    }

    async fn append_turns(&self, session_id: Uuid, turns: &[Turn]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        if !inner.sessions.contains_key(&session_id) {
            return Err(session_missing(session_id));
        }
        inner
            .transcripts
            .entry(session_id)
            .or_default()
            .extend_from_slice(turns);
        Ok(())
    }

    async fn list_turns(&self, session_id: Uuid) -> Result<Vec<Turn>, StorageError> {
        Ok(self
            .inner
            .lock()
            .await
            .transcripts
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_investigation(&self, order: &InvestigationOrder) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        let orders = inner.investigations.entry(order.session_id).or_default();
        if orders.iter().any(|o| o.kind == order.kind) {
            return Err(StorageError::Conflict {
                key: keys::investigation(order.session_id, order.kind),
            });
        }
        orders.push(order.clone());
        Ok(())
    }

    async fn list_investigations(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<InvestigationOrder>, StorageError> {
        Ok(self
            .inner
            .lock()
            .await
            .investigations
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit_submission(
        &self,
        session_id: Uuid,
        diagnosis: &str,
        report: &ScoreReport,
    ) -> Result<SubmissionOutcome, StorageError> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_missing(session_id))?;

        // Work on a copy so a failed transition leaves the record untouched.
        let mut updated = record.clone();
        if let Some(outcome) = apply_submission(&mut updated, diagnosis, report)? {
            return Ok(outcome);
        }
        let session = updated.session.clone();
        *record = updated;
        Ok(SubmissionOutcome::Committed(session))
    }

    async fn get_report(&self, session_id: Uuid) -> Result<Option<ScoreReport>, StorageError> {
        self.inner
            .lock()
            .await
            .sessions
            .get(&session_id)
            .map(|r| r.report.clone())
            .ok_or_else(|| session_missing(session_id))
    }
}
