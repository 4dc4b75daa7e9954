//! Deterministic detection of investigation orders and result requests in
//! a learner's utterance.
//!
//! Keyword and regex only, so the same utterance always produces the same
//! intent. Chinese and English phrasings are both recognised.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use clinisim_core::catalog::InvestigationType;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestIntent {
    /// The learner asks for these investigations to be done.
    Order(Vec<InvestigationType>),
    /// The learner asks to see results of these investigations.
    Result(Vec<InvestigationType>),
}

impl TestIntent {
    pub fn types(&self) -> &[InvestigationType] {
        match self {
            TestIntent::Order(types) | TestIntent::Result(types) => types,
        }
    }
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("intent pattern is a valid regex")
}

/// Matched against the lower-cased utterance, in this order. English
/// abbreviations need a non-letter on each side; CJK text has no word
/// boundaries to rely on.
static KEYWORDS: LazyLock<Vec<(Regex, InvestigationType)>> = LazyLock::new(|| {
    use InvestigationType::*;
    [
        (r"血常规|血常|(?:^|[^a-z])cbc(?:$|[^a-z])|blood count|blood routine|blood test", BloodRoutine),
        (r"尿常规|尿常|urinalysis|urine routine|urine test", UrineRoutine),
        (r"心电|(?:^|[^a-z])(?:ecg|ekg)(?:$|[^a-z])|electrocardiogram", Ecg),
        (r"超声|b\s?超|ultrasound|sonograph", Ultrasound),
        (r"x光|x-ray|x ray|xray|胸片|chest film", XRay),
        (r"(?:^|[^a-z])ct(?:$|[^a-z])", Ct),
    ]
    .into_iter()
    .map(|(re, kind)| (pattern(re), kind))
    .collect()
});

static RESULT_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"结果|报告|片子|片|单|(?:^|[^a-z])(?:results?|reports?|findings)(?:$|[^a-z])|came back")
});

static ORDER_VERBS_ZH: LazyLock<Regex> = LazyLock::new(|| pattern(r"做|查|开|申请|安排"));

/// English orders must be imperative: the verb opens a clause, optionally
/// after "please" or a first-person lead such as "let's" or "can we".
/// "Did you get a blood test?" is a history question, not an order, and a
/// bare "do" only counts after a lead since "Do you..." asks the patient.
static ORDER_PHRASE_EN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(concat!(
        r"(?:^|[.,;:!?]\s*)",
        r"(?:(?:ok|okay|so|now|then|and|please)\s+)*",
        r"(?:",
        r"(?:let['’]?s|let us|can we|could we|we['’]ll|we will|we should|we need to",
        r"|i['’]ll|i will|i['’]d like to|i want to|i need to|i['’]m going to)\s+",
        r"(?:please\s+)?(?:order|run|get|do|arrange|request|send off|send for)",
        r"|(?:order|run|get|arrange|request|send off|send for)",
        r")(?:$|[^a-z])",
    ))
});

/// Verb followed closely by an investigation, for phrasings the verb list
/// alone misses.
static VERB_THEN_TEST: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(做|查).{0,6}(ct|血常规|尿常规|心电|超声|胸片|x光)"));

/// Experiential aspect after an order verb: "做过", "查过" ask about the
/// patient's past, not for a new investigation.
static HISTORY_MARKER: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?:做|查|开|拍)过"));

fn is_order(text: &str) -> bool {
    if HISTORY_MARKER.is_match(text) {
        return false;
    }
    ORDER_VERBS_ZH.is_match(text) || ORDER_PHRASE_EN.is_match(text) || VERB_THEN_TEST.is_match(text)
}

/// Classify an utterance. Only investigations the case offers are
/// considered; an utterance naming none of them has no intent.
pub fn detect(utterance: &str, offered: &BTreeSet<InvestigationType>) -> Option<TestIntent> {
    let text = utterance.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    let mut matched = Vec::new();
    let mut residue = text.clone();
    for (re, kind) in KEYWORDS.iter() {
        if !re.is_match(&text) {
            continue;
        }
        residue = re.replace_all(&residue, " ").into_owned();
        if offered.contains(kind) && !matched.contains(kind) {
            matched.push(*kind);
        }
    }
    if matched.is_empty() {
        return None;
    }

    // Result words are checked with the investigation names removed, so
    // "胸片" alone reads as an order rather than a result request.
    if RESULT_WORDS.is_match(&residue) {
        return Some(TestIntent::Result(matched));
    }
    if is_order(&text) {
        return Some(TestIntent::Order(matched));
    }
    None
}

/// Render a disclosed result as a reply block.
pub fn format_result(name: &str, result: &BTreeMap<String, serde_json::Value>) -> String {
    if result.is_empty() {
        return format!("[Investigation result] {name}: no abnormality");
    }
    let lines = result
        .iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("{key}: {s}"),
            other => format!("{key}: {other}"),
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("[Investigation result] {name}:\n{lines}")
}
