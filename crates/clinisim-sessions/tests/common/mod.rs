#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clinisim_core::models::case::Case;
use clinisim_core::models::turn::Turn;
use clinisim_llm::budget::TokenEstimator;
use clinisim_llm::client::{ChatBackend, CompletionRequest, DeltaStream};
use clinisim_llm::error::LlmError;
use clinisim_llm::synth::{CaseSynthesizer, SynthesisSettings};
use clinisim_sessions::import::case_from_json;
use clinisim_sessions::lifecycle::SessionService;
use clinisim_sessions::relay::{ConversationRelay, FrameStream, RelayFrame, RelaySettings};
use clinisim_storage::Store;
use clinisim_storage::memory::MemoryStore;
use serde_json::json;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

/// One scripted stream event.
#[derive(Debug, Clone)]
pub enum Delta {
    Text(&'static str),
    Fail,
}

/// Streams a scripted patient reply and answers completions with a
/// scripted case.
pub struct ScriptedPatient {
    deltas: Vec<Delta>,
    completions: Mutex<VecDeque<String>>,
    pub stream_calls: AtomicU32,
    pub complete_calls: AtomicU32,
}

impl ScriptedPatient {
    pub fn new(deltas: Vec<Delta>) -> Arc<Self> {
        Arc::new(Self {
            deltas,
            completions: Mutex::new(VecDeque::new()),
            stream_calls: AtomicU32::new(0),
            complete_calls: AtomicU32::new(0),
        })
    }

    pub fn replying(text: &'static str) -> Arc<Self> {
        Self::new(vec![Delta::Text(text)])
    }

    pub async fn queue_completion(&self, text: String) {
        self.completions.lock().await.push_back(text);
    }

    pub fn streams(&self) -> u32 {
        self.stream_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for ScriptedPatient {
    fn model_id(&self) -> &str {
        "scripted-patient"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.completions
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| LlmError::Connection("no scripted completion".to_string()))
    }

    async fn stream(&self, _request: &CompletionRequest) -> Result<DeltaStream, LlmError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(16);
        let deltas = self.deltas.clone();
        tokio::spawn(async move {
            for delta in deltas {
                let item = match delta {
                    Delta::Text(text) => Ok(text.to_string()),
                    Delta::Fail => Err(LlmError::Status {
                        status: 502,
                        body: "upstream went away".to_string(),
                    }),
                };
                if tx.send(item).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

pub fn case_json() -> serde_json::Value {
    json!({
        "case_number": "CS-0042",
        "title": "Chest pain on exertion",
        "difficulty": "medium",
        "department": "Cardiology",
        "patient": { "age": 58, "gender": "male", "occupation": "bus driver" },
        "chief_complaint": "Chest tightness for two hours",
        "present_illness": "Crushing central chest pain radiating to the left arm, with sweating.",
        "past_history": { "diseases": ["hypertension"], "allergies": [], "medications": ["amlodipine"] },
        "personal_history": "Smokes 20 a day",
        "family_history": "Father had a heart attack at 60",
        "exam": {
            "visible": { "general": "pale and sweaty", "pulse": "104/min" },
            "on_examination": { "heart": "no murmur" }
        },
        "investigations": [
            { "type": "ecg", "name": "12-lead ECG", "result": { "st_segment": "elevated in V1-V4" } },
            { "type": "blood_routine", "name": "Complete blood count", "result": {} },
            { "type": "x_ray", "name": "Chest X-ray", "result": { "lungs": "clear" } }
        ],
        "ground_truth": {
            "primary_diagnosis": "Acute anterior myocardial infarction",
            "differential": ["Aortic dissection", "Unstable angina"],
            "key_points": ["chest pain", "radiation", "smoking"],
            "recommended_investigations": ["ecg"]
        }
    })
}

pub fn sample_case() -> Case {
    case_from_json(&case_json().to_string()).unwrap()
}

pub fn relay_settings(window: u32) -> RelaySettings {
    RelaySettings {
        window,
        max_reply_tokens: 500,
        min_reply_tokens: 16,
        temperature: 0.7,
        history_turns: 20,
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub backend: Arc<ScriptedPatient>,
    pub service: SessionService,
    pub case: Case,
}

pub async fn harness(backend: Arc<ScriptedPatient>, intent_ordering: bool) -> Harness {
    harness_with_window(backend, intent_ordering, 8192).await
}

pub async fn harness_with_window(
    backend: Arc<ScriptedPatient>,
    intent_ordering: bool,
    window: u32,
) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let case = sample_case();
    store.put_case(&case).await.unwrap();

    let relay = ConversationRelay::new(
        backend.clone(),
        store.clone(),
        TokenEstimator::Heuristic,
        relay_settings(window),
    );
    let synthesizer = CaseSynthesizer::new(
        backend.clone(),
        TokenEstimator::Heuristic,
        window,
        SynthesisSettings {
            temperature: 0.8,
            max_tokens: 1200,
            retries: 1,
        },
    );
    let service = SessionService::new(store.clone(), relay, synthesizer, intent_ordering);
    Harness {
        store,
        backend,
        service,
        case,
    }
}

/// Read frames until the producer closes the stream.
pub async fn drain(mut frames: FrameStream) -> Vec<RelayFrame> {
    let mut out = Vec::new();
    while let Some(frame) = frames.recv().await {
        out.push(frame);
    }
    out
}

/// Poll until the transcript reaches `count` turns.
pub async fn wait_for_turns(store: &MemoryStore, session_id: Uuid, count: usize) -> Vec<Turn> {
    for _ in 0..100 {
        let turns = store.list_turns(session_id).await.unwrap();
        if turns.len() >= count {
            return turns;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    store.list_turns(session_id).await.unwrap()
}
