mod common;

use clinisim_core::catalog::InvestigationType;
use clinisim_core::models::case::CaseSource;
use clinisim_core::models::session::SessionStatus;
use clinisim_sessions::error::SessionError;
use clinisim_sessions::lifecycle::CaseSelector;
use clinisim_sessions::relay::RelayFrame;
use clinisim_storage::Store;
use uuid::Uuid;

use common::{ScriptedPatient, case_json, drain, harness};

const OWNER: &str = "learner-1";

#[tokio::test]
async fn create_runs_an_existing_case() {
    let h = harness(ScriptedPatient::replying("Hello doctor."), false).await;

    let (session, case) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();
    assert_eq!(case.id, h.case.id);
    assert_eq!(session.owner, OWNER);
    assert_eq!(session.status, SessionStatus::InProgress);
    assert!(session.submitted_diagnosis.is_none());

    let listed = h.service.list(OWNER).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(h.service.list("someone-else").await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_case_is_not_found() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let err = h.service.create(OWNER, CaseSelector::Case(Uuid::new_v4())).await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)));
}

#[tokio::test]
async fn inactive_case_is_not_found() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let mut retired = common::sample_case();
    retired.active = false;
    h.store.put_case(&retired).await.unwrap();

    let err = h.service.create(OWNER, CaseSelector::Case(retired.id)).await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)));
    assert_eq!(h.service.list_cases().await.unwrap().len(), 1);
}

#[tokio::test]
async fn synthesized_case_is_stored_before_the_session() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    h.backend.queue_completion(case_json().to_string()).await;

    let (session, case) = h
        .service
        .create(OWNER, CaseSelector::Synthesize { disease_id: Some("stemi".to_string()) })
        .await
        .unwrap();

    let stored = h.store.get_case(case.id).await.unwrap();
    assert_eq!(stored.source, CaseSource::Synthesized);
    let generation = stored.generation.unwrap();
    assert_eq!(generation.disease_id, "stemi");
    assert_eq!(generation.model, "scripted-patient");
    assert_eq!(session.case_id, case.id);
}

#[tokio::test]
async fn failed_synthesis_creates_nothing() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    h.backend.queue_completion("no json here".to_string()).await;
    h.backend.queue_completion("{\"title\": \"still not a case\"}".to_string()).await;

    let err = h
        .service
        .create(OWNER, CaseSelector::Synthesize { disease_id: None })
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::UpstreamMalformed(_)));
    assert_eq!(h.store.list_cases().await.unwrap().len(), 1);
    assert!(h.service.list(OWNER).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_disease_is_not_found() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let err = h
        .service
        .create(OWNER, CaseSelector::Synthesize { disease_id: Some("not-a-disease".to_string()) })
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)));
}

#[tokio::test]
async fn post_turn_streams_and_records_the_exchange() {
    let h = harness(ScriptedPatient::replying("It started this morning."), false).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();

    let frames = drain(h.service.post_turn(session.id, OWNER, "When did it start?").await.unwrap()).await;
    assert!(matches!(frames.last(), Some(RelayFrame::Done { .. })));

    let detail = h.service.get(session.id, OWNER).await.unwrap();
    assert_eq!(detail.turns.len(), 2);
    assert_eq!(detail.case.title, "Chest pain on exertion");
    assert!(detail.report.is_none());
}

#[tokio::test]
async fn non_owner_is_forbidden_everywhere() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();
    let intruder = "learner-2";

    assert!(matches!(h.service.get(session.id, intruder).await, Err(SessionError::Forbidden)));
    assert!(matches!(
        h.service.post_turn(session.id, intruder, "hello").await,
        Err(SessionError::Forbidden)
    ));
    assert!(matches!(
        h.service.order_investigation(session.id, intruder, InvestigationType::Ecg).await,
        Err(SessionError::Forbidden)
    ));
    assert!(matches!(
        h.service.submit(session.id, intruder, "myocardial infarction").await,
        Err(SessionError::Forbidden)
    ));
    assert!(matches!(h.service.delete(session.id, intruder).await, Err(SessionError::Forbidden)));
    assert_eq!(h.backend.streams(), 0);
}

#[tokio::test]
async fn missing_session_is_not_found() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let err = h.service.post_turn(Uuid::new_v4(), OWNER, "hello").await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)));
}

#[tokio::test]
async fn blank_utterance_and_diagnosis_are_rejected() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();

    assert!(matches!(
        h.service.post_turn(session.id, OWNER, "   ").await,
        Err(SessionError::InvalidInput(_))
    ));
    assert!(matches!(
        h.service.submit(session.id, OWNER, "  ").await,
        Err(SessionError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn ordering_discloses_the_result_once() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();

    let order = h
        .service
        .order_investigation(session.id, OWNER, InvestigationType::Ecg)
        .await
        .unwrap();
    assert_eq!(order.name, "12-lead ECG");
    assert_eq!(order.result["st_segment"], "elevated in V1-V4");

    let err = h
        .service
        .order_investigation(session.id, OWNER, InvestigationType::Ecg)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Conflict(_)));
    assert_eq!(h.service.list_investigations(session.id, OWNER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn investigation_not_offered_is_not_found() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();

    let err = h
        .service
        .order_investigation(session.id, OWNER, InvestigationType::Ct)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)));
    assert!(h.service.list_investigations(session.id, OWNER).await.unwrap().is_empty());
}

#[tokio::test]
async fn submit_scores_and_is_idempotent() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();
    h.service
        .order_investigation(session.id, OWNER, InvestigationType::Ecg)
        .await
        .unwrap();

    let first = h
        .service
        .submit(session.id, OWNER, "Acute anterior myocardial infarction")
        .await
        .unwrap();
    assert_eq!(first.card.dimensions.investigation_appropriateness, 100.0);
    assert_eq!(first.card.dimensions.diagnosis_accuracy, 100.0);
    assert_eq!(first.scoring_method, "rule_based");

    let second = h.service.submit(session.id, OWNER, "Something else entirely").await.unwrap();
    assert_eq!(second.card, first.card);
    assert_eq!(second.scored_at, first.scored_at);

    let stored = h.store.get_session(session.id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::Submitted);
    assert_eq!(stored.submitted_diagnosis.as_deref(), Some("Acute anterior myocardial infarction"));
    assert!(stored.ended_at.is_some());
    assert_eq!(h.service.report(session.id, OWNER).await.unwrap().card, first.card);
}

#[tokio::test]
async fn submitted_session_rejects_further_work() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();
    h.service.submit(session.id, OWNER, "angina").await.unwrap();

    assert!(matches!(
        h.service.post_turn(session.id, OWNER, "one more question").await,
        Err(SessionError::InvalidState(_))
    ));
    assert!(matches!(
        h.service.order_investigation(session.id, OWNER, InvestigationType::XRay).await,
        Err(SessionError::InvalidState(_))
    ));
    assert_eq!(h.backend.streams(), 0);
}

#[tokio::test]
async fn report_before_submission_is_invalid_state() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();
    assert!(matches!(
        h.service.report(session.id, OWNER).await,
        Err(SessionError::InvalidState(_))
    ));
}

#[tokio::test]
async fn delete_removes_the_session_and_its_records() {
    let h = harness(ScriptedPatient::replying("Fine."), false).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();
    drain(h.service.post_turn(session.id, OWNER, "How are you?").await.unwrap()).await;
    h.service
        .order_investigation(session.id, OWNER, InvestigationType::Ecg)
        .await
        .unwrap();

    h.service.delete(session.id, OWNER).await.unwrap();
    assert!(matches!(h.service.get(session.id, OWNER).await, Err(SessionError::NotFound(_))));
    assert!(h.store.list_turns(session.id).await.unwrap().is_empty());
    assert!(h.store.list_investigations(session.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn intent_ordering_answers_without_the_model() {
    let h = harness(ScriptedPatient::replying("unused"), true).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();

    let frames = drain(h.service.post_turn(session.id, OWNER, "Please order an ECG").await.unwrap()).await;
    let RelayFrame::Content(text) = &frames[0] else {
        panic!("expected content, got {:?}", frames[0]);
    };
    assert!(text.contains("[Investigation result] 12-lead ECG"));
    assert!(text.contains("st_segment: elevated in V1-V4"));
    assert_eq!(h.backend.streams(), 0);

    let orders = h.service.list_investigations(session.id, OWNER).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].kind, InvestigationType::Ecg);
    assert_eq!(h.store.list_turns(session.id).await.unwrap().len(), 2);

    // Asking again reports the existing order instead of creating another.
    let frames = drain(h.service.post_turn(session.id, OWNER, "Order an ECG again").await.unwrap()).await;
    let RelayFrame::Content(text) = &frames[0] else {
        panic!("expected content, got {:?}", frames[0]);
    };
    assert!(text.contains("already ordered"));
    assert_eq!(h.service.list_investigations(session.id, OWNER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn history_questions_reach_the_patient_and_order_nothing() {
    let h = harness(ScriptedPatient::replying("No, never."), true).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();

    drain(h.service.post_turn(session.id, OWNER, "Did you get a blood test last year?").await.unwrap()).await;
    assert_eq!(h.backend.streams(), 1);
    assert!(h.service.list_investigations(session.id, OWNER).await.unwrap().is_empty());

    // A later deliberate order is still accepted.
    h.service
        .order_investigation(session.id, OWNER, InvestigationType::BloodRoutine)
        .await
        .unwrap();
}

#[tokio::test]
async fn result_request_for_unordered_investigation_says_so() {
    let h = harness(ScriptedPatient::replying("unused"), true).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();

    let frames = drain(h.service.post_turn(session.id, OWNER, "What did the x-ray report say?").await.unwrap()).await;
    let RelayFrame::Content(text) = &frames[0] else {
        panic!("expected content, got {:?}", frames[0]);
    };
    assert_eq!(text, "Chest X-ray has not been ordered yet.");
    assert!(h.service.list_investigations(session.id, OWNER).await.unwrap().is_empty());
}

#[tokio::test]
async fn intents_go_to_the_model_when_disabled() {
    let h = harness(ScriptedPatient::replying("Okay."), false).await;
    let (session, _) = h.service.create(OWNER, CaseSelector::Case(h.case.id)).await.unwrap();

    drain(h.service.post_turn(session.id, OWNER, "Please order an ECG").await.unwrap()).await;
    assert_eq!(h.backend.streams(), 1);
    assert!(h.service.list_investigations(session.id, OWNER).await.unwrap().is_empty());
}

#[tokio::test]
async fn case_menu_hides_results() {
    let h = harness(ScriptedPatient::replying("unused"), false).await;
    let menu = h.service.case_menu(h.case.id).await.unwrap();
    assert_eq!(menu.len(), 3);
    let rendered = serde_json::to_string(&menu).unwrap();
    assert!(!rendered.contains("elevated"));
    let cases = serde_json::to_string(&h.service.list_cases().await.unwrap()).unwrap();
    assert!(!cases.contains("myocardial"));
}
