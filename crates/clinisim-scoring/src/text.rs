//! Word splitting and the fixed vocabularies used by keyword matching.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Characters treated as word boundaries in addition to whitespace.
const SEPARATORS: &[char] = &[
    '（', '）', '(', ')', '、', '，', '。', '？', '！', '；', '：', ',', '.', ';', ':', '!', '?',
    '/', '"', '\'', '-',
];

/// Split text into candidate words, dropping words shorter than two
/// characters.
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .filter(|w| w.chars().count() >= 2)
}

static FUNCTION_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "and", "any", "are", "as", "at", "be", "by", "do", "does", "for", "from",
        "has", "have", "if", "in", "is", "it", "its", "of", "on", "or", "the", "to", "was",
        "were", "with", "without",
    ]
    .into_iter()
    .collect()
});

/// Qualifiers too generic to identify a diagnosis on their own.
static DIAGNOSIS_STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "acute", "chronic", "type", "primary", "secondary", "disease", "syndrome", "disorder",
        "急性", "慢性", "型", "性", "期", "症", "病",
    ]
    .into_iter()
    .chain(FUNCTION_WORDS.iter().copied())
    .collect()
});

/// Lay and clinical phrasings a learner may use for a key-point word.
static SYNONYMS: LazyLock<HashMap<&'static str, &'static [&'static str]>> = LazyLock::new(|| {
    HashMap::from([
        ("fever", &["temperature", "febrile", "feverish", "chills"] as &[_]),
        ("cough", &["coughing", "sputum", "phlegm"] as &[_]),
        ("headache", &["head hurt", "head pain", "head ache"] as &[_]),
        ("abdominal", &["belly", "stomach", "tummy", "abdomen"] as &[_]),
        ("vomiting", &["vomit", "throw up", "threw up", "being sick"] as &[_]),
        ("nausea", &["nauseous", "queasy", "feel sick"] as &[_]),
        ("diarrhea", &["loose stool", "diarrhoea", "bowel movement"] as &[_]),
        ("dyspnea", &["short of breath", "breathless", "breathing"] as &[_]),
        ("breath", &["breathing", "breathless"] as &[_]),
        ("smoking", &["smoke", "cigarette", "tobacco"] as &[_]),
        ("alcohol", &["drink", "drinking"] as &[_]),
        ("allergies", &["allergic", "allergy"] as &[_]),
        ("medications", &["medicine", "medication", "pills", "tablets"] as &[_]),
        ("urination", &["urinate", "pee", "urine", "bladder"] as &[_]),
        ("throat", &["swallow", "swallowing"] as &[_]),
        ("pressure", &["hypertension", "blood pressure"] as &[_]),
        ("onset", &["when did", "how long", "start"] as &[_]),
        ("duration", &["how long", "since when"] as &[_]),
        ("发热", &["发烧", "体温", "高烧", "低烧"] as &[_]),
        ("咽痛", &["嗓子疼", "喉咙痛", "咽部"] as &[_]),
        ("咳嗽", &["咳", "干咳", "有痰"] as &[_]),
        ("头痛", &["头疼", "头晕"] as &[_]),
        ("腹痛", &["肚子疼", "腹部"] as &[_]),
        ("血压", &["高血压", "低血压"] as &[_]),
        ("体征", &["检查", "查体"] as &[_]),
    ])
});

/// Matching tokens for one key point: its significant words, their
/// synonyms, and the whole point. All lower-cased.
pub fn key_point_tokens(point: &str) -> Vec<String> {
    let point = point.trim().to_lowercase();
    let mut tokens = Vec::new();
    for word in words(&point).filter(|w| !FUNCTION_WORDS.contains(w)) {
        tokens.push(word.to_string());
        if let Some(alternates) = SYNONYMS.get(word) {
            tokens.extend(alternates.iter().map(|s| s.to_string()));
        }
    }
    if !point.is_empty() {
        tokens.push(point);
    }
    tokens
}

/// Significant words of a diagnosis label, original casing preserved.
pub fn diagnosis_keywords(diagnosis: &str) -> Vec<&str> {
    words(diagnosis)
        .filter(|w| !DIAGNOSIS_STOP_WORDS.contains(w.to_lowercase().as_str()))
        .collect()
}
