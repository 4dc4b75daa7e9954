use clinisim_audit::events::{AuditAction, AuditEvent};
use serde_json::json;

#[test]
fn action_names_match_serialized_form() {
    for action in [
        AuditAction::CaseImported,
        AuditAction::CaseSynthesized,
        AuditAction::SessionCreated,
        AuditAction::SessionDeleted,
        AuditAction::TurnPersisted,
        AuditAction::InvestigationOrdered,
        AuditAction::DiagnosisSubmitted,
    ] {
        assert_eq!(serde_json::to_value(action).unwrap(), json!(action.as_str()));
    }
}

#[test]
fn event_carries_details() {
    let event = AuditEvent::new(AuditAction::DiagnosisSubmitted, "session", 7, "alice")
        .with_details(json!({ "total_score": 80.0 }));

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["action"], "diagnosis_submitted");
    assert_eq!(value["resource_id"], "7");
    assert_eq!(value["actor"], "alice");
    assert_eq!(value["details"]["total_score"], 80.0);

    event.emit();
}
