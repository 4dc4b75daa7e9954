use clinisim_core::catalog::{self, DISEASES, InvestigationType};
use clinisim_core::error::CoreError;
use clinisim_core::models::session::{Session, SessionStatus};
use uuid::Uuid;

#[test]
fn only_in_progress_to_submitted_is_legal() {
    assert!(SessionStatus::InProgress.can_transition_to(SessionStatus::Submitted));
    assert!(!SessionStatus::Submitted.can_transition_to(SessionStatus::InProgress));
    assert!(!SessionStatus::Submitted.can_transition_to(SessionStatus::Submitted));
    assert!(!SessionStatus::InProgress.can_transition_to(SessionStatus::InProgress));
}

#[test]
fn submit_records_diagnosis_once() {
    let mut session = Session::new("learner", Uuid::new_v4());
    let at = jiff::Timestamp::now();
    session.submit("pneumonia", at).unwrap();
    assert_eq!(session.status, SessionStatus::Submitted);
    assert_eq!(session.submitted_diagnosis.as_deref(), Some("pneumonia"));
    assert_eq!(session.ended_at, Some(at));

    let err = session.submit("bronchitis", at).unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
    assert_eq!(session.submitted_diagnosis.as_deref(), Some("pneumonia"));
}

#[test]
fn status_serializes_as_snake_case() {
    assert_eq!(serde_json::to_string(&SessionStatus::InProgress).unwrap(), "\"in_progress\"");
    assert_eq!(SessionStatus::Submitted.to_string(), "submitted");
}

#[test]
fn investigation_codes_round_trip() {
    for kind in InvestigationType::ALL {
        assert_eq!(kind.code().parse::<InvestigationType>().unwrap(), kind);
    }
    assert!("mri".parse::<InvestigationType>().is_err());
    assert_eq!(
        InvestigationType::vocabulary(),
        "blood_routine, urine_routine, ecg, x_ray, ultrasound, ct"
    );
}

#[test]
fn disease_catalog_ids_are_unique() {
    let mut ids: Vec<_> = DISEASES.iter().map(|d| d.id).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert!(total >= 100);
    assert_eq!(catalog::disease("gout").unwrap().label, "Acute gouty arthritis");
    assert!(matches!(catalog::disease("nope"), Err(CoreError::UnknownDisease(_))));
}
