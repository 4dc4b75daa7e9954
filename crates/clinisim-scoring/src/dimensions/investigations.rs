use clinisim_core::catalog::InvestigationType;
use clinisim_core::models::score::ScoreAudit;

use crate::{Dimension, Encounter};

/// Orders beyond this many are penalized when the case recommends nothing.
const FREE_ORDERS: usize = 2;
const UNGUIDED_PENALTY: f64 = 10.0;
const EXTRANEOUS_PENALTY: f64 = 5.0;

/// Whether the learner ordered what the case calls for, without excess.
pub struct InvestigationAppropriateness;

impl InvestigationAppropriateness {
    pub const ID: &'static str = "investigation_appropriateness";
}

impl Dimension for InvestigationAppropriateness {
    fn id(&self) -> &str {
        Self::ID
    }

    fn weight(&self) -> f64 {
        20.0
    }

    fn evaluate(&self, encounter: &Encounter<'_>, audit: &mut ScoreAudit) -> f64 {
        let ordered = distinct(encounter.ordered);
        let recommended = distinct(&encounter.ground_truth.recommended_investigations);
        audit.investigations_ordered = ordered.clone();
        audit.investigations_recommended = recommended.clone();

        if recommended.is_empty() {
            let excess = ordered.len().saturating_sub(FREE_ORDERS);
            return (100.0 - UNGUIDED_PENALTY * excess as f64).max(0.0);
        }

        let (appropriate, extraneous): (Vec<_>, Vec<_>) =
            ordered.iter().copied().partition(|t| recommended.contains(t));
        let coverage = appropriate.len() as f64 / recommended.len() as f64 * 100.0;
        let penalty = EXTRANEOUS_PENALTY * extraneous.len() as f64;
        audit.investigations_appropriate = appropriate;
        audit.investigations_extraneous = extraneous;

        (coverage - penalty).max(0.0)
    }
}

fn distinct(types: &[InvestigationType]) -> Vec<InvestigationType> {
    let mut out = Vec::with_capacity(types.len());
    for t in types {
        if !out.contains(t) {
            out.push(*t);
        }
    }
    out
}
