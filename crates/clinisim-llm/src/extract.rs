//! Parsing, normalization and validation of case documents.
//!
//! All functions here are pure. The same path handles synthesized model
//! output and fixed case files, so both reach storage in one shape.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use clinisim_core::catalog::InvestigationType;
use clinisim_core::models::case::{CaseContent, Difficulty};
use serde_json::{Map, Value, json};

use crate::error::LlmError;

/// Fields every case document must carry.
const REQUIRED_FIELDS: &[&str] = &[
    "title",
    "difficulty",
    "department",
    "patient",
    "chief_complaint",
    "present_illness",
    "investigations",
    "ground_truth",
];

const HISTORY_LISTS: [&str; 3] = ["diseases", "allergies", "medications"];

/// Alternate phrasings of investigation types, keyed lower-case.
static INVESTIGATION_SYNONYMS: LazyLock<HashMap<&'static str, InvestigationType>> =
    LazyLock::new(|| {
        use InvestigationType::*;
        HashMap::from([
            ("血常规", BloodRoutine),
            ("全血细胞计数", BloodRoutine),
            ("cbc", BloodRoutine),
            ("complete blood count", BloodRoutine),
            ("full blood count", BloodRoutine),
            ("blood routine", BloodRoutine),
            ("尿常规", UrineRoutine),
            ("urinalysis", UrineRoutine),
            ("urine routine", UrineRoutine),
            ("心电图", Ecg),
            ("心电", Ecg),
            ("ekg", Ecg),
            ("electrocardiogram", Ecg),
            ("胸片", XRay),
            ("胸部x光片", XRay),
            ("x光", XRay),
            ("x 线", XRay),
            ("x线", XRay),
            ("x-ray", XRay),
            ("x ray", XRay),
            ("xray", XRay),
            ("chest x-ray", XRay),
            ("chest radiograph", XRay),
            ("超声", Ultrasound),
            ("b超", Ultrasound),
            ("b 超", Ultrasound),
            ("ultrasonography", Ultrasound),
            ("sonography", Ultrasound),
            ("ct scan", Ct),
            ("computed tomography", Ct),
        ])
    });

/// Map a code or alternate phrasing to its investigation type.
pub fn investigation_type(label: &str) -> Option<InvestigationType> {
    let key = label.trim().to_lowercase();
    InvestigationType::from_code(&key).or_else(|| INVESTIGATION_SYNONYMS.get(key.as_str()).copied())
}

/// Remove a surrounding Markdown code fence, with or without a language tag.
pub fn strip_code_fences(text: &str) -> &str {
    let s = text.trim();
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// The outermost JSON object in `text`: from the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> &str {
    let s = strip_code_fences(text);
    match (s.find('{'), s.rfind('}')) {
        (Some(start), Some(end)) if end > start => &s[start..=end],
        _ => s,
    }
}

/// Parse a model response into a JSON object.
pub fn parse_case_value(text: &str) -> Result<Value, LlmError> {
    let candidate = extract_json_object(text);
    if candidate.is_empty() {
        return Err(LlmError::Malformed("empty response".to_string()));
    }
    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| LlmError::Malformed(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(LlmError::Malformed("response is not a JSON object".to_string()));
    }
    Ok(value)
}

/// Repair the common ways a case document deviates from the schema.
/// Anything this cannot repair is left for [`validate_case_value`].
pub fn normalize_case_value(value: &mut Value) {
    let Some(doc) = value.as_object_mut() else {
        return;
    };

    normalize_past_history(doc);

    if let Some(Value::Object(patient)) = doc.get_mut("patient") {
        let coerced = patient.get("age").and_then(Value::as_str).map(|age| {
            let digits: String = age
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<u64>().map(Value::from).unwrap_or(Value::Null)
        });
        if let Some(age) = coerced {
            patient.insert("age".to_string(), age);
        }
    }

    if let Some(Value::Array(items)) = doc.get_mut("investigations") {
        for item in items.iter_mut().filter_map(Value::as_object_mut) {
            normalize_investigation(item);
        }
    }

    if let Some(Value::Object(truth)) = doc.get_mut("ground_truth")
        && let Some(Value::Array(recommended)) = truth.get_mut("recommended_investigations")
    {
        let normalized: Vec<Value> = recommended
            .iter()
            .filter_map(Value::as_str)
            .map(|label| match investigation_type(label) {
                Some(kind) => Value::from(kind.code()),
                None => Value::from(label),
            })
            .collect();
        *recommended = normalized;
    }
}

fn normalize_past_history(doc: &mut Map<String, Value>) {
    let history = doc
        .entry("past_history")
        .or_insert_with(|| Value::Object(Map::new()));
    if !history.is_object() {
        *history = Value::Object(Map::new());
    }
    if let Some(history) = history.as_object_mut() {
        for key in HISTORY_LISTS {
            let entry = history.entry(key).or_insert_with(|| json!([]));
            let replacement = match &*entry {
                Value::Array(_) => None,
                Value::String(s) if !s.trim().is_empty() => Some(json!([s])),
                _ => Some(json!([])),
            };
            if let Some(list) = replacement {
                *entry = list;
            }
        }
    }
}

fn normalize_investigation(item: &mut Map<String, Value>) {
    let kind = item
        .get("type")
        .and_then(Value::as_str)
        .and_then(investigation_type);
    if let Some(kind) = kind {
        item.insert("type".to_string(), Value::from(kind.code()));
        let has_name = item
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|n| !n.trim().is_empty());
        if !has_name {
            item.insert("name".to_string(), Value::from(kind.display_name()));
        }
    }

    let result = item.remove("result").unwrap_or(Value::Null);
    let result = match result {
        Value::Object(_) => result,
        Value::Null => Value::Object(Map::new()),
        Value::String(s) => json!({ "summary": s }),
        other => json!({ "summary": other.to_string() }),
    };
    item.insert("result".to_string(), result);
}

/// Check a normalized document and convert it into case content.
pub fn validate_case_value(value: Value) -> Result<CaseContent, LlmError> {
    let doc = value
        .as_object()
        .ok_or_else(|| LlmError::Malformed("case is not a JSON object".to_string()))?;

    for field in REQUIRED_FIELDS {
        if doc.get(*field).is_none_or(Value::is_null) {
            return Err(LlmError::Malformed(format!("missing field: {field}")));
        }
    }

    let difficulty = doc.get("difficulty").and_then(Value::as_str).unwrap_or_default();
    if !Difficulty::CODES.contains(&difficulty) {
        return Err(LlmError::Malformed(format!(
            "difficulty '{difficulty}' not in {:?}",
            Difficulty::CODES
        )));
    }

    if let Some(Value::Array(items)) = doc.get("investigations") {
        for item in items {
            let kind = item.get("type").and_then(Value::as_str).unwrap_or_default();
            if InvestigationType::from_code(kind).is_none() {
                return Err(LlmError::Malformed(format!(
                    "investigation type '{kind}' not in vocabulary ({})",
                    InvestigationType::vocabulary()
                )));
            }
        }
    }

    let content: CaseContent = serde_json::from_value(value)
        .map_err(|e| LlmError::Malformed(format!("case does not match schema: {e}")))?;

    let offered: BTreeSet<InvestigationType> =
        content.investigations.iter().map(|i| i.kind).collect();
    let truth = &content.ground_truth;
    if let Some(missing) = truth
        .recommended_investigations
        .iter()
        .find(|t| !offered.contains(t))
    {
        return Err(LlmError::Malformed(format!(
            "recommended investigation '{missing}' is not offered by the case"
        )));
    }
    if truth.primary_diagnosis.trim().is_empty() {
        return Err(LlmError::Malformed("empty primary diagnosis".to_string()));
    }
    if !truth.key_points.iter().any(|p| !p.trim().is_empty()) {
        return Err(LlmError::Malformed("no key points".to_string()));
    }

    Ok(content)
}

/// Parse, normalize and validate a raw model response.
pub fn case_from_response(text: &str) -> Result<CaseContent, LlmError> {
    let mut value = parse_case_value(text)?;
    normalize_case_value(&mut value);
    validate_case_value(value)
}
