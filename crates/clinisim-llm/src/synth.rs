//! Case synthesis: ask the model for a complete teaching case built around a
//! catalog diagnosis, then parse, normalize and validate it.

use std::sync::Arc;

use clinisim_core::catalog::{self, DISEASES, Disease, InvestigationType};
use clinisim_core::models::case::{CaseContent, GenerationMeta};
use rand::seq::IndexedRandom;
use tracing::{info, warn};

use crate::budget::{ContextBudget, TokenEstimator};
use crate::client::{ChatBackend, ChatMessage, CompletionRequest};
use crate::error::LlmError;
use crate::extract::case_from_response;

/// Bumped whenever the prompt contract changes.
pub const PROMPT_VERSION: &str = "1.0";

/// Smallest ceiling ever requested, so an oversized prompt still fails with
/// a concrete parse error.
const MIN_ATTEMPT_TOKENS: u32 = 16;

#[derive(Debug, Clone, Copy)]
pub struct SynthesisSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Additional attempts after the first.
    pub retries: u32,
}

/// A synthesized case together with how it was produced.
#[derive(Debug, Clone)]
pub struct SynthesizedCase {
    pub content: CaseContent,
    pub generation: GenerationMeta,
}

pub struct CaseSynthesizer {
    backend: Arc<dyn ChatBackend>,
    estimator: TokenEstimator,
    window: u32,
    settings: SynthesisSettings,
}

impl CaseSynthesizer {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        estimator: TokenEstimator,
        window: u32,
        settings: SynthesisSettings,
    ) -> Self {
        Self {
            backend,
            estimator,
            window,
            settings,
        }
    }

    /// The requested disease, or a uniform random pick from the catalog.
    pub fn pick_disease(disease_id: Option<&str>) -> Result<&'static Disease, LlmError> {
        match disease_id {
            Some(id) => Ok(catalog::disease(id)?),
            None => DISEASES
                .choose(&mut rand::rng())
                .ok_or_else(|| LlmError::Malformed("disease catalog is empty".to_string())),
        }
    }

    /// Generation ceiling for a prompt.
    pub fn max_tokens(&self, messages: &[ChatMessage]) -> u32 {
        let budget = ContextBudget {
            window: self.window,
            max_reply_tokens: self.settings.max_tokens,
            min_reply_tokens: MIN_ATTEMPT_TOKENS,
        };
        budget.floored_ceiling(
            self.estimator.count_messages(messages),
            self.settings.max_tokens,
            MIN_ATTEMPT_TOKENS,
        )
    }

    /// Produce a validated case. Generation, parsing, normalization and
    /// validation are retried together, `retries + 1` attempts in total.
    pub async fn synthesize(&self, disease_id: Option<&str>) -> Result<SynthesizedCase, LlmError> {
        let disease = Self::pick_disease(disease_id)?;
        let messages = messages(disease);
        let max_tokens = self.max_tokens(&messages);
        let request = CompletionRequest {
            messages,
            temperature: self.settings.temperature,
            max_tokens,
            json_object: true,
        };
        let generated_at = jiff::Timestamp::now();
        let attempts = self.settings.retries + 1;

        let mut last_error = None;
        for attempt in 1..=attempts {
            let outcome = match self.backend.complete(&request).await {
                Ok(text) => case_from_response(&text),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(content) => {
                    info!(
                        disease = disease.id,
                        attempt,
                        model = self.backend.model_id(),
                        "case synthesized"
                    );
                    return Ok(SynthesizedCase {
                        content,
                        generation: GenerationMeta {
                            generated_at,
                            prompt_version: PROMPT_VERSION.to_string(),
                            model: self.backend.model_id().to_string(),
                            temperature: self.settings.temperature,
                            max_tokens,
                            attempts: attempt,
                            disease_id: disease.id.to_string(),
                            disease_label: disease.label.to_string(),
                        },
                    });
                }
                Err(e) => {
                    warn!(disease = disease.id, attempt, attempts, error = %e, "case synthesis attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Malformed("no synthesis attempt made".to_string())))
    }
}

/// Prompt messages for one disease.
pub fn messages(disease: &Disease) -> Vec<ChatMessage> {
    let system = format!(
        "\
You generate clinical teaching cases for simulated patient interviews.
Output exactly one JSON object and nothing else: no Markdown, no comments.

Rules:
1. The case must be internally consistent: symptoms, signs and results fit the diagnosis.
2. difficulty is one of: easy, medium, hard.
3. patient.gender is male or female; patient.age is a number.
4. past_history is an object with arrays diseases, allergies, medications.
5. investigations[].type is one of: {vocabulary}. result is an object.
6. ground_truth.recommended_investigations lists types taken from investigations[].type.
7. ground_truth.key_points are short everyday phrases a student could ask about.
8. Output must be strict JSON with no trailing commas.

Fields:
- title, difficulty, department
- patient {{age, gender, occupation}}
- chief_complaint, present_illness
- past_history {{diseases[], allergies[], medications[]}}
- personal_history, family_history
- exam {{visible {{temperature, pulse, respiration, blood_pressure, general}}, on_examination {{}}}}
- investigations [{{type, name, result {{}}}}]
- ground_truth {{primary_diagnosis, differential[], key_points[], recommended_investigations[]}}",
        vocabulary = InvestigationType::vocabulary(),
    );
    let user = format!(
        "Create a new case whose primary diagnosis is: {label}.\n\
         recommended_investigations must use type codes, not investigation names.",
        label = disease.label,
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}
