use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use clinisim_core::catalog::DISEASES;
use clinisim_llm::budget::TokenEstimator;
use clinisim_llm::client::{ChatBackend, CompletionRequest, DeltaStream};
use clinisim_llm::error::LlmError;
use clinisim_llm::synth::{CaseSynthesizer, PROMPT_VERSION, SynthesisSettings, messages};
use serde_json::json;
use tokio::sync::Mutex;

/// Replays scripted completions in order.
struct Scripted {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: AtomicU32,
    last_max_tokens: AtomicU32,
}

impl Scripted {
    fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicU32::new(0),
            last_max_tokens: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl ChatBackend for Scripted {
    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        assert!(request.json_object);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_max_tokens.store(request.max_tokens, Ordering::SeqCst);
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Connection("script exhausted".to_string())))
    }

    async fn stream(&self, _request: &CompletionRequest) -> Result<DeltaStream, LlmError> {
        unimplemented!("synthesis never streams")
    }
}

fn valid_case() -> String {
    json!({
        "title": "Chest pain on exertion",
        "difficulty": "hard",
        "department": "Cardiology",
        "patient": { "age": "58", "gender": "male", "occupation": "driver" },
        "chief_complaint": "Chest tightness for two hours",
        "present_illness": "Crushing central chest pain radiating to the left arm.",
        "past_history": "hypertension",
        "exam": { "visible": { "general": "sweaty" }, "on_examination": {} },
        "investigations": [
            { "type": "心电图", "name": "ECG", "result": "ST elevation V1-V4" },
            { "type": "blood_routine", "name": "CBC", "result": {} }
        ],
        "ground_truth": {
            "primary_diagnosis": "Acute ST-elevation myocardial infarction",
            "differential": ["Aortic dissection"],
            "key_points": ["chest pain", "radiation"],
            "recommended_investigations": ["ecg"]
        }
    })
    .to_string()
}

fn invalid_case() -> String {
    let mut value: serde_json::Value = serde_json::from_str(&valid_case()).unwrap();
    value["ground_truth"]["recommended_investigations"] = json!(["ct"]);
    value.to_string()
}

fn synthesizer(backend: Arc<Scripted>, retries: u32) -> CaseSynthesizer {
    CaseSynthesizer::new(
        backend,
        TokenEstimator::Heuristic,
        8192,
        SynthesisSettings {
            temperature: 0.8,
            max_tokens: 1200,
            retries,
        },
    )
}

#[tokio::test]
async fn first_valid_reply_is_accepted_with_provenance() {
    let backend = Scripted::new(vec![Ok(format!("```json\n{}\n```", valid_case()))]);
    let synth = synthesizer(backend.clone(), 2);

    let case = synth.synthesize(Some("stemi")).await.unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert_eq!(case.content.patient.age, Some(58));
    assert_eq!(case.generation.attempts, 1);
    assert_eq!(case.generation.disease_id, "stemi");
    assert_eq!(
        case.generation.disease_label,
        "Acute ST-elevation myocardial infarction"
    );
    assert_eq!(case.generation.model, "scripted-model");
    assert_eq!(case.generation.prompt_version, PROMPT_VERSION);
    assert_eq!(case.generation.max_tokens, 1200);
}

#[tokio::test]
async fn invalid_replies_are_retried_until_one_validates() {
    let backend = Scripted::new(vec![
        Ok("not json at all".to_string()),
        Ok(invalid_case()),
        Ok(valid_case()),
    ]);
    let synth = synthesizer(backend.clone(), 2);

    let case = synth.synthesize(Some("stemi")).await.unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    assert_eq!(case.generation.attempts, 3);
}

#[tokio::test]
async fn unoffered_recommendation_surfaces_malformed_after_exhaustion() {
    let backend = Scripted::new(vec![Ok(invalid_case()), Ok(invalid_case()), Ok(invalid_case())]);
    let synth = synthesizer(backend.clone(), 2);

    let err = synth.synthesize(None).await.unwrap_err();
    assert!(matches!(err, LlmError::Malformed(_)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn last_failure_decides_the_error_class() {
    let backend = Scripted::new(vec![Ok("garbage".to_string()), Err(LlmError::Timeout)]);
    let synth = synthesizer(backend.clone(), 1);

    let err = synth.synthesize(None).await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn tiny_window_still_attempts_with_floor() {
    let backend = Scripted::new(vec![Ok(valid_case())]);
    let synth = CaseSynthesizer::new(
        backend.clone(),
        TokenEstimator::Heuristic,
        64,
        SynthesisSettings {
            temperature: 0.8,
            max_tokens: 1200,
            retries: 0,
        },
    );
    synth.synthesize(Some("stemi")).await.unwrap();
    assert_eq!(backend.last_max_tokens.load(Ordering::SeqCst), 16);
}

#[tokio::test]
async fn unknown_disease_is_rejected_before_calling_the_model() {
    let backend = Scripted::new(vec![]);
    let synth = synthesizer(backend.clone(), 2);

    assert!(matches!(
        synth.synthesize(Some("not_a_disease")).await,
        Err(LlmError::Core(_))
    ));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn random_pick_comes_from_the_catalog() {
    for _ in 0..20 {
        let disease = CaseSynthesizer::pick_disease(None).unwrap();
        assert!(DISEASES.iter().any(|d| d.id == disease.id));
    }
}

#[test]
fn prompt_names_the_disease_and_vocabulary() {
    let disease = CaseSynthesizer::pick_disease(Some("gout")).unwrap();
    let prompt = messages(disease);
    assert!(prompt[1].content.contains("Acute gouty arthritis"));
    assert!(prompt[0].content.contains("blood_routine, urine_routine, ecg"));
}
