//! Bucket-backed store.
//!
//! Layout (see `clinisim_core::keys`):
//!
//! ```text
//! cases/{id}.json
//! sessions/{id}/session.json                  session + report
//! sessions/{id}/transcript.json               turns, appended with If-Match
//! sessions/{id}/investigations/{type}.json    created with If-None-Match
//! owners/{owner}/{session_id}                 empty listing marker
//! ```

use async_trait::async_trait;
use aws_sdk_s3::Client;
use clinisim_core::keys;
use clinisim_core::models::case::Case;
use clinisim_core::models::investigation::InvestigationOrder;
use clinisim_core::models::score::ScoreReport;
use clinisim_core::models::session::Session;
use clinisim_core::models::turn::Turn;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StorageError;
use crate::objects::{self, Precondition};
use crate::state::{create_state, load_state, load_state_opt, save_state_if_match};
use crate::{SessionRecord, Store, SubmissionOutcome, apply_submission};

/// Optimistic-lock retries for read-modify-write documents.
const MAX_WRITE_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    async fn load_record(&self, id: Uuid) -> Result<(SessionRecord, String), StorageError> {
        load_state(&self.client, &self.bucket, &keys::session(id)).await
    }

    /// Load every JSON document under a prefix, skipping keys that vanish
    /// between listing and reading.
    async fn load_all<T: serde::de::DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<Vec<T>, StorageError> {
        let keys = objects::list_objects(&self.client, &self.bucket, prefix).await?;
        let mut items = Vec::with_capacity(keys.len());
        for key in &keys {
            match load_state_opt::<T>(&self.client, &self.bucket, key).await? {
                Some((item, _)) => items.push(item),
                None => debug!(key = %key, "object vanished during listing"),
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl Store for S3Store {
    async fn put_case(&self, case: &Case) -> Result<(), StorageError> {
        create_state(&self.client, &self.bucket, &keys::case(case.id), case).await?;
        Ok(())
    }

    async fn get_case(&self, id: Uuid) -> Result<Case, StorageError> {
        let (case, _) = load_state(&self.client, &self.bucket, &keys::case(id)).await?;
        Ok(case)
    }

    async fn list_cases(&self) -> Result<Vec<Case>, StorageError> {
        let mut cases: Vec<Case> = self.load_all(keys::CASES_PREFIX).await?;
        cases.sort_by_key(|c| (c.created_at, c.id));
        Ok(cases)
    }

    async fn create_session(&self, session: &Session) -> Result<(), StorageError> {
        let record = SessionRecord {
            session: session.clone(),
            report: None,
        };
        create_state(&self.client, &self.bucket, &keys::session(session.id), &record).await?;
        objects::put_object(
            &self.client,
            &self.bucket,
            &keys::owner_session_marker(&session.owner, session.id),
            Vec::new(),
            None,
            Precondition::None,
        )
        .await?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Session, StorageError> {
        Ok(self.load_record(id).await?.0.session)
    }

    async fn list_sessions(&self, owner: &str) -> Result<Vec<Session>, StorageError> {
        let prefix = keys::owner_prefix(owner);
        let markers = objects::list_objects(&self.client, &self.bucket, &prefix).await?;

        let mut sessions = Vec::with_capacity(markers.len());
        for marker in &markers {
            let Ok(id) = Uuid::parse_str(&marker[prefix.len()..]) else {
                warn!(key = %marker, "ignoring malformed owner marker");
                continue;
            };
            match self.get_session(id).await {
                Ok(session) => sessions.push(session),
                Err(e) if e.is_not_found() => debug!(session_id = %id, "stale owner marker"),
                Err(e) => return Err(e),
            }
        }
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), StorageError> {
        let session = self.get_session(id).await?;
        let deleted =
            objects::delete_objects_by_prefix(&self.client, &self.bucket, &keys::session_prefix(id))
                .await?;
        objects::delete_object(
            &self.client,
            &self.bucket,
            &keys::owner_session_marker(&session.owner, id),
        )
        .await?;
        debug!(session_id = %id, objects = deleted, "session deleted");
        Ok(())
    }

    async fn append_turns(&self, session_id: Uuid, turns: &[Turn]) -> Result<(), StorageError> {
        // Refuse to resurrect a transcript for a deleted session.
        self.get_session(session_id).await?;

        let key = keys::transcript(session_id);
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let existing = load_state_opt::<Vec<Turn>>(&self.client, &self.bucket, &key).await?;
            let result = match existing {
                Some((mut transcript, etag)) => {
                    transcript.extend_from_slice(turns);
                    save_state_if_match(&self.client, &self.bucket, &key, &transcript, &etag)
                        .await
                }
                None => create_state(&self.client, &self.bucket, &key, &turns.to_vec()).await,
            };
            match result {
                Ok(_) => return Ok(()),
                Err(StorageError::PreconditionFailed { .. } | StorageError::Conflict { .. }) => {
                    debug!(session_id = %session_id, attempt, "transcript write raced, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(StorageError::Contended {
            key,
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    async fn list_turns(&self, session_id: Uuid) -> Result<Vec<Turn>, StorageError> {
        let key = keys::transcript(session_id);
        Ok(load_state_opt(&self.client, &self.bucket, &key)
            .await?
            .map(|(turns, _)| turns)
            .unwrap_or_default())
    }

    async fn insert_investigation(&self, order: &InvestigationOrder) -> Result<(), StorageError> {
        let key = keys::investigation(order.session_id, order.kind);
        create_state(&self.client, &self.bucket, &key, order).await?;
        Ok(())
    }

    async fn list_investigations(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<InvestigationOrder>, StorageError> {
        let mut orders: Vec<InvestigationOrder> = self
            .load_all(&keys::investigations_prefix(session_id))
            .await?;
        orders.sort_by_key(|o| o.ordered_at);
        Ok(orders)
    }

    async fn commit_submission(
        &self,
        session_id: Uuid,
        diagnosis: &str,
        report: &ScoreReport,
    ) -> Result<SubmissionOutcome, StorageError> {
        let key = keys::session(session_id);
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let (mut record, etag) = self.load_record(session_id).await?;
            if let Some(outcome) = apply_submission(&mut record, diagnosis, report)? {
                return Ok(outcome);
            }
            match save_state_if_match(&self.client, &self.bucket, &key, &record, &etag).await {
                Ok(_) => return Ok(SubmissionOutcome::Committed(record.session)),
                Err(StorageError::PreconditionFailed { .. }) => {
                    debug!(session_id = %session_id, attempt, "submission raced, reloading");
                }
                Err(e) => return Err(e),
            }
        }
        Err(StorageError::Contended {
            key,
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    async fn get_report(&self, session_id: Uuid) -> Result<Option<ScoreReport>, StorageError> {
        Ok(self.load_record(session_id).await?.0.report)
    }
}
