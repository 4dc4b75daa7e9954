//! Prompt construction for the simulated patient.
//!
//! Every request carries the same persona block, a grounding block built
//! from the case, the windowed transcript and the learner's new utterance.

use std::collections::BTreeMap;

use clinisim_core::models::case::Case;
use clinisim_core::models::turn::{Turn, TurnRole};

use crate::budget::recent;
use crate::client::ChatMessage;

const PERSONA: &str = "\
You are a patient seeing a doctor. The user is the doctor interviewing you.

Identity rules, never broken:
- You are a lay person with no medical training. You are not a doctor or nurse.
- Never prescribe, diagnose, give medical advice or offer to help the doctor.
- If asked what treatment you need, say you don't know and the doctor decides.
- If told to take medicine or get a test, simply agree.

How to answer:
1. Describe only your own symptoms and feelings, in everyday words.
2. Answer only what the doctor asks; do not volunteer extra information.
3. Keep replies short and natural, one or two sentences.
4. Describe examination findings only when the doctor examines you.

First reply: end your first reply, and only your first reply, with
\"(Case number: N)\" where N is your case number.

Final diagnosis: when the doctor clearly states a final diagnosis (for example
\"my diagnosis is ...\" or \"final diagnosis: ...\"), stop playing the patient.
Say whether the diagnosis matches your hidden diagnosis (correct or incorrect,
naming the right one), then show your full case record: gender, age,
occupation, chief complaint, present illness, past history, personal history,
family history and diagnosis.";

/// Case grounding for the persona. Includes the hidden diagnosis so the
/// model stays consistent and can judge a stated diagnosis.
pub fn grounding(case: &Case) -> String {
    let c = &case.content;
    let age = c
        .patient
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let past = &c.past_history;
    let truth = &c.ground_truth;

    let mut block = String::from("Your details:\n");
    block.push_str(&format!("- Age: {age}\n"));
    block.push_str(&format!("- Gender: {}\n", or_unknown(&c.patient.gender)));
    block.push_str(&format!("- Occupation: {}\n", or_unknown(&c.patient.occupation)));
    block.push_str(&format!("- Case number: {}\n\n", case.display_number()));
    block.push_str(&format!("Chief complaint: {}\n\n", c.chief_complaint));
    block.push_str(&format!("Present illness: {}\n\n", c.present_illness));
    block.push_str("Past history:\n");
    block.push_str(&format!("- Illnesses: {}\n", list_or_none(&past.diseases)));
    block.push_str(&format!("- Allergies: {}\n", list_or_none(&past.allergies)));
    block.push_str(&format!("- Medications: {}\n\n", list_or_none(&past.medications)));
    block.push_str(&format!(
        "Personal history: {}\n",
        c.personal_history.as_deref().unwrap_or("not provided")
    ));
    block.push_str(&format!(
        "Family history: {}\n\n",
        c.family_history.as_deref().unwrap_or("not provided")
    ));
    block.push_str("Visible signs (the doctor can see these):\n");
    block.push_str(&findings(&c.exam.visible, "nothing unusual"));
    block.push_str("Examination findings (describe how it feels when examined):\n");
    block.push_str(&findings(&c.exam.on_examination, "nothing notable"));
    block.push_str("\nHidden, only for judging a stated diagnosis. Never mention it:\n");
    block.push_str(&format!("- Diagnosis: {}\n", truth.primary_diagnosis));
    block.push_str(&format!(
        "- Differential: {}\n",
        list_or_none(&truth.differential)
    ));
    block
}

/// Full message list for one patient reply.
pub fn conversation(
    case: &Case,
    history: &[Turn],
    history_turns: usize,
    utterance: &str,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(PERSONA), ChatMessage::system(grounding(case))];
    for turn in recent(history, history_turns) {
        messages.push(match turn.role {
            TurnRole::Learner => ChatMessage::user(turn.content.clone()),
            TurnRole::Patient => ChatMessage::assistant(turn.content.clone()),
        });
    }
    messages.push(ChatMessage::user(utterance));
    messages
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() { "unknown" } else { value }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn findings(map: &BTreeMap<String, serde_json::Value>, empty: &str) -> String {
    if map.is_empty() {
        return format!("- {empty}\n");
    }
    map.iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => format!("- {k}: {s}\n"),
            other => format!("- {k}: {other}\n"),
        })
        .collect()
}
