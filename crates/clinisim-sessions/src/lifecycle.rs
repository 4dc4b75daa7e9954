//! Session lifecycle: create, converse, order investigations, submit.
//!
//! Every operation checks existence, ownership and status before doing any
//! work, so a rejected call has no side effects.

use std::sync::Arc;

use clinisim_audit::events::{AuditAction, AuditEvent};
use clinisim_core::catalog::InvestigationType;
use clinisim_core::models::case::{Case, CaseBrief, CaseSource, CaseSummary, InvestigationMenuItem};
use clinisim_core::models::investigation::InvestigationOrder;
use clinisim_core::models::score::ScoreReport;
use clinisim_core::models::session::{Session, SessionStatus};
use clinisim_core::models::turn::Turn;
use clinisim_llm::synth::CaseSynthesizer;
use clinisim_scoring::Encounter;
use clinisim_storage::error::StorageError;
use clinisim_storage::{Store, SubmissionOutcome};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SessionError;
use crate::intents::{self, TestIntent};
use crate::relay::{ConversationRelay, FrameStream};

/// Which case a new session runs.
#[derive(Debug, Clone)]
pub enum CaseSelector {
    /// An existing, active case.
    Case(Uuid),
    /// A freshly synthesized case, for the given disease or a random one.
    Synthesize { disease_id: Option<String> },
}

/// A session as returned to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub case: CaseBrief,
    pub turns: Vec<Turn>,
    pub investigations: Vec<InvestigationOrder>,
    pub report: Option<ScoreReport>,
}

pub struct SessionService {
    store: Arc<dyn Store>,
    relay: ConversationRelay,
    synthesizer: CaseSynthesizer,
    intent_ordering: bool,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn Store>,
        relay: ConversationRelay,
        synthesizer: CaseSynthesizer,
        intent_ordering: bool,
    ) -> Self {
        Self {
            store,
            relay,
            synthesizer,
            intent_ordering,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    // ── Cases ──────────────────────────────────────────────────────

    /// Active cases, without ground truth.
    pub async fn list_cases(&self) -> Result<Vec<CaseSummary>, SessionError> {
        let cases = self.store.list_cases().await?;
        Ok(cases.iter().filter(|c| c.active).map(Case::summary).collect())
    }

    /// The investigations a case offers, without results.
    pub async fn case_menu(&self, case_id: Uuid) -> Result<Vec<InvestigationMenuItem>, SessionError> {
        Ok(self.active_case(case_id).await?.investigation_menu())
    }

    async fn active_case(&self, case_id: Uuid) -> Result<Case, SessionError> {
        let case = self.store.get_case(case_id).await?;
        if !case.active {
            return Err(SessionError::NotFound(format!("case {case_id}")));
        }
        Ok(case)
    }

    async fn synthesize_case(&self, owner: &str, disease_id: Option<&str>) -> Result<Case, SessionError> {
        let synthesized = self.synthesizer.synthesize(disease_id).await?;
        let mut case = Case::new(synthesized.content, CaseSource::Synthesized);
        let disease = synthesized.generation.disease_id.clone();
        case.generation = Some(synthesized.generation);
        self.store.put_case(&case).await?;

        AuditEvent::new(AuditAction::CaseSynthesized, "case", case.id, owner)
            .with_details(json!({ "disease_id": disease }))
            .emit();
        Ok(case)
    }

    // ── Sessions ───────────────────────────────────────────────────

    /// Start a session. A synthesized case is stored before the session
    /// that refers to it.
    pub async fn create(&self, owner: &str, selector: CaseSelector) -> Result<(Session, Case), SessionError> {
        let case = match selector {
            CaseSelector::Case(id) => self.active_case(id).await?,
            CaseSelector::Synthesize { disease_id } => {
                self.synthesize_case(owner, disease_id.as_deref()).await?
            }
        };

        let session = Session::new(owner, case.id);
        self.store.create_session(&session).await?;
        info!(session_id = %session.id, case_id = %case.id, "session created");
        AuditEvent::new(AuditAction::SessionCreated, "session", session.id, owner)
            .with_details(json!({ "case_id": case.id, "source": case.source }))
            .emit();
        Ok((session, case))
    }

    /// Load a session and check that `owner` may act on it.
    async fn owned(&self, session_id: Uuid, owner: &str) -> Result<Session, SessionError> {
        let session = self.store.get_session(session_id).await?;
        if session.owner != owner {
            warn!(%session_id, "session accessed by non-owner");
            return Err(SessionError::Forbidden);
        }
        Ok(session)
    }

    fn require_in_progress(session: &Session) -> Result<(), SessionError> {
        if session.status != SessionStatus::InProgress {
            return Err(SessionError::InvalidState(format!(
                "session {} is {}",
                session.id, session.status
            )));
        }
        Ok(())
    }

    pub async fn list(&self, owner: &str) -> Result<Vec<Session>, SessionError> {
        Ok(self.store.list_sessions(owner).await?)
    }

    pub async fn get(&self, session_id: Uuid, owner: &str) -> Result<SessionDetail, SessionError> {
        let session = self.owned(session_id, owner).await?;
        let case = self.store.get_case(session.case_id).await?;
        let turns = self.store.list_turns(session_id).await?;
        let investigations = self.store.list_investigations(session_id).await?;
        let report = self.store.get_report(session_id).await?;
        Ok(SessionDetail {
            session,
            case: case.brief(),
            turns,
            investigations,
            report,
        })
    }

    pub async fn delete(&self, session_id: Uuid, owner: &str) -> Result<(), SessionError> {
        self.owned(session_id, owner).await?;
        self.store.delete_session(session_id).await?;
        info!(%session_id, "session deleted");
        AuditEvent::new(AuditAction::SessionDeleted, "session", session_id, owner).emit();
        Ok(())
    }

    // ── Conversation ───────────────────────────────────────────────

    /// Send a learner utterance and stream the patient's reply. All checks
    /// happen before the stream opens.
    pub async fn post_turn(
        &self,
        session_id: Uuid,
        owner: &str,
        utterance: &str,
    ) -> Result<FrameStream, SessionError> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(SessionError::InvalidInput("message must not be empty".to_string()));
        }
        let session = self.owned(session_id, owner).await?;
        Self::require_in_progress(&session)?;
        let case = self.store.get_case(session.case_id).await?;

        if self.intent_ordering {
            if let Some(intent) = intents::detect(utterance, &case.offered_types()) {
                info!(%session_id, ?intent, "investigation intent detected");
                let reply = self.answer_intent(&session, &case, &intent).await?;
                return Ok(self.relay.canned(&session, utterance, reply));
            }
        }

        let history = self.store.list_turns(session_id).await?;
        Ok(self.relay.open(&session, &case, &history, utterance))
    }

    async fn answer_intent(
        &self,
        session: &Session,
        case: &Case,
        intent: &TestIntent,
    ) -> Result<String, SessionError> {
        let mut existing = self.store.list_investigations(session.id).await?;
        let mut blocks = Vec::new();

        for &kind in intent.types() {
            let already = existing.iter().find(|o| o.kind == kind).cloned();
            let block = match (intent, already) {
                (_, Some(order)) => {
                    let note = match intent {
                        TestIntent::Order(_) => format!("{} was already ordered.\n", order.name),
                        TestIntent::Result(_) => String::new(),
                    };
                    format!("{note}{}", intents::format_result(&order.name, &order.result))
                }
                (TestIntent::Order(_), None) => {
                    let order = self.place_order(session, case, kind).await?;
                    let text = intents::format_result(&order.name, &order.result);
                    existing.push(order);
                    text
                }
                (TestIntent::Result(_), None) => {
                    let name = case
                        .investigation(kind)
                        .map(|i| i.name.as_str())
                        .unwrap_or(kind.display_name());
                    format!("{name} has not been ordered yet.")
                }
            };
            blocks.push(block);
        }
        Ok(blocks.join("\n\n"))
    }

    // ── Investigations ─────────────────────────────────────────────

    pub async fn order_investigation(
        &self,
        session_id: Uuid,
        owner: &str,
        kind: InvestigationType,
    ) -> Result<InvestigationOrder, SessionError> {
        let session = self.owned(session_id, owner).await?;
        Self::require_in_progress(&session)?;
        let case = self.store.get_case(session.case_id).await?;
        self.place_order(&session, &case, kind).await
    }

    async fn place_order(
        &self,
        session: &Session,
        case: &Case,
        kind: InvestigationType,
    ) -> Result<InvestigationOrder, SessionError> {
        let offered = case
            .investigation(kind)
            .ok_or_else(|| SessionError::NotFound(format!("investigation {kind} for case {}", case.id)))?;
        let order = InvestigationOrder::disclose(session.id, offered);
        self.store.insert_investigation(&order).await.map_err(|e| match e {
            StorageError::Conflict { .. } => {
                SessionError::Conflict(format!("{kind} already ordered in session {}", session.id))
            }
            other => other.into(),
        })?;

        info!(session_id = %session.id, investigation = %kind, "investigation ordered");
        AuditEvent::new(AuditAction::InvestigationOrdered, "session", session.id, session.owner.as_str())
            .with_details(json!({ "type": kind }))
            .emit();
        Ok(order)
    }

    pub async fn list_investigations(
        &self,
        session_id: Uuid,
        owner: &str,
    ) -> Result<Vec<InvestigationOrder>, SessionError> {
        self.owned(session_id, owner).await?;
        Ok(self.store.list_investigations(session_id).await?)
    }

    // ── Submission ─────────────────────────────────────────────────

    /// Score the encounter and close the session. Submitting an already
    /// submitted session returns its stored report unchanged.
    pub async fn submit(
        &self,
        session_id: Uuid,
        owner: &str,
        diagnosis: &str,
    ) -> Result<ScoreReport, SessionError> {
        let session = self.owned(session_id, owner).await?;
        if session.status.is_terminal() {
            return self.existing_report(session_id).await;
        }
        let diagnosis = diagnosis.trim();
        if diagnosis.is_empty() {
            return Err(SessionError::InvalidInput("diagnosis must not be empty".to_string()));
        }

        let case = self.store.get_case(session.case_id).await?;
        let turns = self.store.list_turns(session_id).await?;
        let ordered: Vec<InvestigationType> = self
            .store
            .list_investigations(session_id)
            .await?
            .iter()
            .map(|o| o.kind)
            .collect();

        let card = clinisim_scoring::score(&Encounter {
            ground_truth: case.ground_truth(),
            turns: &turns,
            ordered: &ordered,
            diagnosis,
        });
        let report = ScoreReport::new(session_id, card, jiff::Timestamp::now());

        match self.store.commit_submission(session_id, diagnosis, &report).await? {
            SubmissionOutcome::Committed(_) => {
                info!(%session_id, total = report.card.total_score, "diagnosis submitted");
                AuditEvent::new(AuditAction::DiagnosisSubmitted, "session", session_id, owner)
                    .with_details(json!({
                        "total_score": report.card.total_score,
                        "rule_set_version": report.card.audit.rule_set_version,
                    }))
                    .emit();
                Ok(report)
            }
            SubmissionOutcome::AlreadySubmitted(_, existing) => {
                info!(%session_id, "submission raced an earlier one, returning stored report");
                Ok(existing)
            }
        }
    }

    async fn existing_report(&self, session_id: Uuid) -> Result<ScoreReport, SessionError> {
        self.store
            .get_report(session_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(format!("report for session {session_id}")))
    }

    /// The report of a submitted session.
    pub async fn report(&self, session_id: Uuid, owner: &str) -> Result<ScoreReport, SessionError> {
        let session = self.owned(session_id, owner).await?;
        if !session.status.is_terminal() {
            return Err(SessionError::InvalidState(format!(
                "session {session_id} has not been submitted"
            )));
        }
        self.existing_report(session_id).await
    }
}
