use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::catalog::InvestigationType;

/// A teaching case as stored: identity and provenance around the authored
/// (or synthesized) content.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Case {
    pub id: Uuid,
    /// Short identifier the simulated patient reveals on its first reply.
    #[serde(default)]
    pub case_number: Option<String>,
    #[serde(flatten)]
    pub content: CaseContent,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub source: CaseSource,
    #[serde(default)]
    pub generation: Option<GenerationMeta>,
    pub created_at: jiff::Timestamp,
}

fn default_active() -> bool {
    true
}

/// The authored part of a case. This is exactly the JSON object a case file
/// or the synthesis model provides.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CaseContent {
    pub title: String,
    pub difficulty: Difficulty,
    pub department: String,
    pub patient: PatientProfile,
    pub chief_complaint: String,
    pub present_illness: String,
    #[serde(default)]
    pub past_history: PastHistory,
    #[serde(default)]
    pub personal_history: Option<String>,
    #[serde(default)]
    pub family_history: Option<String>,
    #[serde(default)]
    pub exam: ExamFindings,
    pub investigations: Vec<AvailableInvestigation>,
    pub ground_truth: GroundTruth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const CODES: [&'static str; 3] = ["easy", "medium", "hard"];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CaseSource {
    #[default]
    Fixed,
    Synthesized,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PatientProfile {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub occupation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PastHistory {
    #[serde(default)]
    pub diseases: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
}

/// Examination findings. `visible` is apparent at a glance; `on_examination`
/// is only described when the learner examines the patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExamFindings {
    #[serde(default)]
    pub visible: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub on_examination: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AvailableInvestigation {
    #[serde(rename = "type")]
    pub kind: InvestigationType,
    pub name: String,
    #[serde(default)]
    pub result: BTreeMap<String, serde_json::Value>,
}

/// Hidden grading data. Never shown to the learner during the interview.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GroundTruth {
    #[serde(default)]
    pub primary_diagnosis: String,
    #[serde(default)]
    pub differential: Vec<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub recommended_investigations: Vec<InvestigationType>,
}

/// Provenance recorded for every synthesized case.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GenerationMeta {
    pub generated_at: jiff::Timestamp,
    pub prompt_version: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Attempts used, including the successful one.
    pub attempts: u32,
    pub disease_id: String,
    pub disease_label: String,
}

/// Learner-safe listing entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CaseSummary {
    pub id: Uuid,
    pub title: String,
    pub difficulty: Difficulty,
    pub department: String,
    pub chief_complaint: String,
    pub source: CaseSource,
}

/// What a learner sees when opening a case: the presentation, without
/// history details the interview should uncover or the ground truth.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CaseBrief {
    pub id: Uuid,
    pub title: String,
    pub difficulty: Difficulty,
    pub department: String,
    pub patient: PatientProfile,
    pub chief_complaint: String,
    pub visible: BTreeMap<String, serde_json::Value>,
    pub investigations: Vec<InvestigationMenuItem>,
}

/// An investigation the learner may order, without its result.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvestigationMenuItem {
    #[serde(rename = "type")]
    pub kind: InvestigationType,
    pub name: String,
}

impl Case {
    pub fn new(content: CaseContent, source: CaseSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_number: None,
            content,
            active: true,
            source,
            generation: None,
            created_at: jiff::Timestamp::now(),
        }
    }

    pub fn ground_truth(&self) -> &GroundTruth {
        &self.content.ground_truth
    }

    /// The identifier the patient reveals: the authored case number, or a
    /// short prefix of the id for cases without one.
    pub fn display_number(&self) -> String {
        match &self.case_number {
            Some(n) if !n.trim().is_empty() => n.clone(),
            _ => self.id.simple().to_string()[..8].to_string(),
        }
    }

    pub fn offered_types(&self) -> BTreeSet<InvestigationType> {
        self.content.investigations.iter().map(|i| i.kind).collect()
    }

    pub fn investigation(&self, kind: InvestigationType) -> Option<&AvailableInvestigation> {
        self.content.investigations.iter().find(|i| i.kind == kind)
    }

    pub fn investigation_menu(&self) -> Vec<InvestigationMenuItem> {
        self.content
            .investigations
            .iter()
            .map(|i| InvestigationMenuItem {
                kind: i.kind,
                name: i.name.clone(),
            })
            .collect()
    }

    pub fn brief(&self) -> CaseBrief {
        CaseBrief {
            id: self.id,
            title: self.content.title.clone(),
            difficulty: self.content.difficulty,
            department: self.content.department.clone(),
            patient: self.content.patient.clone(),
            chief_complaint: self.content.chief_complaint.clone(),
            visible: self.content.exam.visible.clone(),
            investigations: self.investigation_menu(),
        }
    }

    pub fn summary(&self) -> CaseSummary {
        CaseSummary {
            id: self.id,
            title: self.content.title.clone(),
            difficulty: self.content.difficulty,
            department: self.content.department.clone(),
            chief_complaint: self.content.chief_complaint.clone(),
            source: self.source,
        }
    }
}
