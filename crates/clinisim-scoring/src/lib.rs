//! clinisim-scoring
//!
//! Rule-based grading of a finished encounter. Pure and deterministic: the
//! same transcript, orders and diagnosis always produce the same card, and
//! every card records the rule set that produced it.

pub mod dimensions;
pub mod text;

use clinisim_core::catalog::InvestigationType;
use clinisim_core::models::case::GroundTruth;
use clinisim_core::models::score::{ScoreAudit, ScoreCard, ScoreDimensions};
use clinisim_core::models::turn::Turn;

use dimensions::diagnosis::DiagnosisAccuracy;
use dimensions::interview::InterviewCompleteness;
use dimensions::investigations::InvestigationAppropriateness;

/// Version stamped into every audit payload.
pub const RULE_SET_VERSION: &str = "1.0";

/// Everything the engine reads. Nothing else influences the outcome.
#[derive(Debug, Clone, Copy)]
pub struct Encounter<'a> {
    pub ground_truth: &'a GroundTruth,
    /// Full transcript; only learner turns are considered.
    pub turns: &'a [Turn],
    /// Investigation types in the order they were placed.
    pub ordered: &'a [InvestigationType],
    pub diagnosis: &'a str,
}

/// Trait implemented by each scored dimension.
pub trait Dimension: Send + Sync {
    /// Identifier used in the score report (e.g., "diagnosis_accuracy").
    fn id(&self) -> &str;

    /// Points this dimension contributes to the total at a score of 100.
    fn weight(&self) -> f64;

    /// Score the encounter on a 0-100 scale, recording evidence in `audit`.
    fn evaluate(&self, encounter: &Encounter<'_>, audit: &mut ScoreAudit) -> f64;
}

/// Return all scored dimensions, in report order.
pub fn all_dimensions() -> Vec<Box<dyn Dimension>> {
    vec![
        Box::new(InterviewCompleteness),
        Box::new(InvestigationAppropriateness),
        Box::new(DiagnosisAccuracy),
    ]
}

/// The highest total an encounter can reach.
pub fn max_total() -> f64 {
    all_dimensions().iter().map(|d| d.weight()).sum()
}

/// Grade an encounter.
pub fn score(encounter: &Encounter<'_>) -> ScoreCard {
    let mut audit = ScoreAudit {
        primary_diagnosis: encounter.ground_truth.primary_diagnosis.clone(),
        submitted_diagnosis: encounter.diagnosis.to_string(),
        rule_set_version: RULE_SET_VERSION.to_string(),
        ..ScoreAudit::default()
    };

    let mut dimensions = ScoreDimensions {
        interview_completeness: 0.0,
        investigation_appropriateness: 0.0,
        diagnosis_accuracy: 0.0,
    };
    let mut total = 0.0;

    for dimension in all_dimensions() {
        let value = dimension.evaluate(encounter, &mut audit);
        total += value * dimension.weight() / 100.0;
        match dimension.id() {
            InterviewCompleteness::ID => dimensions.interview_completeness = round2(value),
            InvestigationAppropriateness::ID => {
                dimensions.investigation_appropriateness = round2(value)
            }
            DiagnosisAccuracy::ID => dimensions.diagnosis_accuracy = round2(value),
            other => tracing::warn!(dimension = other, "unmapped score dimension"),
        }
    }

    let card = ScoreCard {
        total_score: round2(total),
        dimensions,
        audit,
    };
    tracing::debug!(
        total = card.total_score,
        interview = card.dimensions.interview_completeness,
        investigations = card.dimensions.investigation_appropriateness,
        diagnosis = card.dimensions.diagnosis_accuracy,
        "encounter scored"
    );
    card
}

/// Round half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
