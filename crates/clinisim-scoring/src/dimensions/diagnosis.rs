use clinisim_core::models::score::ScoreAudit;

use crate::text::diagnosis_keywords;
use crate::{Dimension, Encounter};

/// How closely the submitted diagnosis matches the ground truth.
///
/// Rules apply in strict priority and the first match wins:
///
/// 1. primary contains the submission or vice versa: 100
/// 2. at least half the primary keywords present: 80, any present: 60
/// 3. per differential, substring either way: 60, any keyword: 40
/// 4. otherwise 0
pub struct DiagnosisAccuracy;

impl DiagnosisAccuracy {
    pub const ID: &'static str = "diagnosis_accuracy";
}

impl Dimension for DiagnosisAccuracy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn weight(&self) -> f64 {
        20.0
    }

    fn evaluate(&self, encounter: &Encounter<'_>, audit: &mut ScoreAudit) -> f64 {
        let submitted = encounter.diagnosis.trim().to_lowercase();
        if submitted.is_empty() {
            return 0.0;
        }

        let truth = encounter.ground_truth;
        let primary = truth.primary_diagnosis.trim();
        if !primary.is_empty() {
            if overlaps(&primary.to_lowercase(), &submitted) {
                audit.diagnosis_keywords_matched.push(primary.to_string());
                return 100.0;
            }
            let keywords = diagnosis_keywords(primary);
            let matched = matching(&keywords, &submitted);
            if !matched.is_empty() {
                let ratio = matched.len() as f64 / keywords.len() as f64;
                audit.diagnosis_keywords_matched.extend(matched);
                return if ratio >= 0.5 { 80.0 } else { 60.0 };
            }
        }

        for differential in &truth.differential {
            let differential = differential.trim();
            if differential.is_empty() {
                continue;
            }
            if overlaps(&differential.to_lowercase(), &submitted) {
                audit.diagnosis_keywords_matched.push(differential.to_string());
                return 60.0;
            }
            let matched = matching(&diagnosis_keywords(differential), &submitted);
            if !matched.is_empty() {
                audit.diagnosis_keywords_matched.extend(matched);
                return 40.0;
            }
        }

        0.0
    }
}

fn overlaps(label: &str, submitted: &str) -> bool {
    label.contains(submitted) || submitted.contains(label)
}

fn matching(keywords: &[&str], submitted: &str) -> Vec<String> {
    keywords
        .iter()
        .filter(|kw| submitted.contains(kw.to_lowercase().as_str()))
        .map(|kw| kw.to_string())
        .collect()
}
