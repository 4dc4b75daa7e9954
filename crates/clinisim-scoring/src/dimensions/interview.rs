use clinisim_core::models::score::ScoreAudit;
use clinisim_core::models::turn::TurnRole;

use crate::text::key_point_tokens;
use crate::{Dimension, Encounter};

/// Share of the case's key points the learner asked about.
pub struct InterviewCompleteness;

impl InterviewCompleteness {
    pub const ID: &'static str = "interview_completeness";
}

impl Dimension for InterviewCompleteness {
    fn id(&self) -> &str {
        Self::ID
    }

    fn weight(&self) -> f64 {
        40.0
    }

    fn evaluate(&self, encounter: &Encounter<'_>, audit: &mut ScoreAudit) -> f64 {
        let key_points = &encounter.ground_truth.key_points;
        audit.key_points_total = key_points.clone();

        let asked = encounter
            .turns
            .iter()
            .filter(|t| t.role == TurnRole::Learner)
            .map(|t| t.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        audit.key_points_covered = key_points
            .iter()
            .filter(|point| {
                key_point_tokens(point)
                    .iter()
                    .any(|token| asked.contains(token.as_str()))
            })
            .cloned()
            .collect();

        if key_points.is_empty() {
            return 100.0;
        }
        audit.key_points_covered.len() as f64 / key_points.len() as f64 * 100.0
    }
}
