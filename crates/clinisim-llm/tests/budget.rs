use clinisim_core::models::turn::Turn;
use clinisim_llm::budget::{ContextBudget, TokenEstimator, recent};
use clinisim_llm::client::ChatMessage;
use clinisim_llm::error::LlmError;
use uuid::Uuid;

const BUDGET: ContextBudget = ContextBudget {
    window: 1024,
    max_reply_tokens: 500,
    min_reply_tokens: 16,
};

#[test]
fn nearly_full_window_is_exhausted() {
    assert_eq!(BUDGET.remaining(1010), 14);
    assert!(matches!(
        BUDGET.ceiling(1010),
        Err(LlmError::ContextExhausted {
            prompt_tokens: 1010,
            window: 1024
        })
    ));
}

#[test]
fn ceiling_is_capped_by_max_reply() {
    assert_eq!(BUDGET.ceiling(100).unwrap(), 500);
    assert_eq!(BUDGET.ceiling(800).unwrap(), 224);
    assert_eq!(BUDGET.ceiling(1008).unwrap(), 16);
}

#[test]
fn overfull_prompt_does_not_underflow() {
    assert_eq!(BUDGET.remaining(5000), 0);
    assert!(BUDGET.ceiling(5000).is_err());
}

#[test]
fn floored_ceiling_never_drops_below_floor() {
    assert_eq!(BUDGET.floored_ceiling(5000, 1200, 16), 16);
    assert_eq!(BUDGET.floored_ceiling(200, 1200, 16), 824);
    assert_eq!(BUDGET.floored_ceiling(0, 600, 16), 600);
}

#[test]
fn heuristic_counts_cjk_per_character() {
    let estimator = TokenEstimator::Heuristic;
    assert_eq!(estimator.count_text(""), 0);
    assert_eq!(estimator.count_text("a"), 1);
    assert_eq!(estimator.count_text("abcdef"), 2);
    assert_eq!(estimator.count_text("发热三天"), 4);
}

#[test]
fn message_count_includes_overhead() {
    let estimator = TokenEstimator::Heuristic;
    let messages = vec![ChatMessage::system("abc"), ChatMessage::user("abcdef")];
    assert_eq!(estimator.count_messages(&messages), (1 + 4) + (2 + 4));
}

#[test]
fn recent_keeps_the_tail() {
    let session = Uuid::new_v4();
    let turns: Vec<Turn> = (0..25)
        .map(|i| Turn::learner(session, format!("q{i}"), 1))
        .collect();
    let kept = recent(&turns, 20);
    assert_eq!(kept.len(), 20);
    assert_eq!(kept[0].content, "q5");
    assert_eq!(recent(&turns[..3], 20).len(), 3);
}
