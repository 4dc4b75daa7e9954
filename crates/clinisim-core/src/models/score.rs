use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::catalog::InvestigationType;

/// The graded outcome of an encounter, independent of when or for which
/// session it was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoreCard {
    pub total_score: f64,
    pub dimensions: ScoreDimensions,
    pub audit: ScoreAudit,
}

/// Dimension scores, each on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoreDimensions {
    pub interview_completeness: f64,
    pub investigation_appropriateness: f64,
    pub diagnosis_accuracy: f64,
}

/// Everything needed to reproduce and explain a score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoreAudit {
    pub key_points_covered: Vec<String>,
    pub key_points_total: Vec<String>,
    pub investigations_ordered: Vec<InvestigationType>,
    pub investigations_recommended: Vec<InvestigationType>,
    pub investigations_appropriate: Vec<InvestigationType>,
    pub investigations_extraneous: Vec<InvestigationType>,
    pub diagnosis_keywords_matched: Vec<String>,
    pub primary_diagnosis: String,
    pub submitted_diagnosis: String,
    pub rule_set_version: String,
}

/// A score card bound to its session. Created exactly once, at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoreReport {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub card: ScoreCard,
    pub scoring_method: String,
    pub scored_at: jiff::Timestamp,
}

impl ScoreReport {
    pub const RULE_BASED: &'static str = "rule_based";

    pub fn new(session_id: Uuid, card: ScoreCard, scored_at: jiff::Timestamp) -> Self {
        Self {
            session_id,
            card,
            scoring_method: Self::RULE_BASED.to_string(),
            scored_at,
        }
    }
}
