//! Fixed lookup tables shared by every component.
//!
//! Both catalogs are process-wide constants. The investigation vocabulary is
//! the contract between case synthesis, investigation ordering and scoring;
//! the disease catalog anchors synthesis prompts to a real diagnosis.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

/// An investigation a learner can order for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum InvestigationType {
    BloodRoutine,
    UrineRoutine,
    Ecg,
    XRay,
    Ultrasound,
    Ct,
}

impl InvestigationType {
    pub const ALL: [InvestigationType; 6] = [
        InvestigationType::BloodRoutine,
        InvestigationType::UrineRoutine,
        InvestigationType::Ecg,
        InvestigationType::XRay,
        InvestigationType::Ultrasound,
        InvestigationType::Ct,
    ];

    /// Canonical vocabulary code, as it appears on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BloodRoutine => "blood_routine",
            Self::UrineRoutine => "urine_routine",
            Self::Ecg => "ecg",
            Self::XRay => "x_ray",
            Self::Ultrasound => "ultrasound",
            Self::Ct => "ct",
        }
    }

    /// Default display name, used when a case does not supply its own.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::BloodRoutine => "Complete blood count",
            Self::UrineRoutine => "Urinalysis",
            Self::Ecg => "Electrocardiogram",
            Self::XRay => "Chest X-ray",
            Self::Ultrasound => "Ultrasound",
            Self::Ct => "CT scan",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// The vocabulary as a comma-separated list, for prompts.
    pub fn vocabulary() -> String {
        Self::ALL
            .iter()
            .map(|t| t.code())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for InvestigationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for InvestigationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| CoreError::UnknownInvestigation(s.to_string()))
    }
}

/// One entry of the disease catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disease {
    pub id: &'static str,
    pub label: &'static str,
}

const fn d(id: &'static str, label: &'static str) -> Disease {
    Disease { id, label }
}

/// Diagnoses that synthesized cases are seeded from.
pub static DISEASES: &[Disease] = &[
    // Respiratory
    d("community_acquired_pneumonia", "Community-acquired pneumonia"),
    d("acute_bronchitis", "Acute bronchitis"),
    d("acute_upper_respiratory_infection", "Acute upper respiratory tract infection"),
    d("influenza", "Influenza"),
    d("acute_tonsillitis", "Acute suppurative tonsillitis"),
    d("asthma_exacerbation", "Acute exacerbation of bronchial asthma"),
    d("copd_exacerbation", "Acute exacerbation of chronic obstructive pulmonary disease"),
    d("pulmonary_tuberculosis", "Pulmonary tuberculosis"),
    d("spontaneous_pneumothorax", "Spontaneous pneumothorax"),
    d("pulmonary_embolism", "Pulmonary embolism"),
    d("parapneumonic_effusion", "Parapneumonic pleural effusion"),
    d("lung_cancer", "Primary bronchogenic carcinoma"),
    d("bronchiectasis", "Bronchiectasis"),
    // Cardiovascular
    d("stable_angina", "Stable angina pectoris"),
    d("unstable_angina", "Unstable angina"),
    d("stemi", "Acute ST-elevation myocardial infarction"),
    d("nstemi", "Non-ST-elevation myocardial infarction"),
    d("acute_heart_failure", "Acute decompensated heart failure"),
    d("atrial_fibrillation", "Atrial fibrillation"),
    d("essential_hypertension", "Primary hypertension"),
    d("hypertensive_emergency", "Hypertensive emergency"),
    d("infective_endocarditis", "Infective endocarditis"),
    d("viral_myocarditis", "Viral myocarditis"),
    d("acute_pericarditis", "Acute pericarditis"),
    d("aortic_dissection", "Acute aortic dissection"),
    d("dilated_cardiomyopathy", "Dilated cardiomyopathy"),
    d("deep_vein_thrombosis", "Lower-extremity deep vein thrombosis"),
    // Digestive
    d("acute_gastroenteritis", "Acute gastroenteritis"),
    d("peptic_ulcer", "Peptic ulcer disease"),
    d("upper_gi_bleeding", "Upper gastrointestinal bleeding"),
    d("acute_appendicitis", "Acute appendicitis"),
    d("acute_cholecystitis", "Acute calculous cholecystitis"),
    d("choledocholithiasis", "Choledocholithiasis"),
    d("acute_pancreatitis", "Acute pancreatitis"),
    d("liver_cirrhosis", "Decompensated liver cirrhosis"),
    d("chronic_hepatitis_b", "Chronic hepatitis B"),
    d("acute_hepatitis_a", "Acute hepatitis A"),
    d("gerd", "Gastroesophageal reflux disease"),
    d("intestinal_obstruction", "Acute intestinal obstruction"),
    d("ulcerative_colitis", "Ulcerative colitis"),
    d("crohns_disease", "Crohn's disease"),
    d("irritable_bowel_syndrome", "Irritable bowel syndrome"),
    d("colorectal_cancer", "Colorectal cancer"),
    d("gastric_cancer", "Gastric cancer"),
    d("hepatocellular_carcinoma", "Hepatocellular carcinoma"),
    d("bacillary_dysentery", "Bacillary dysentery"),
    // Renal and urinary
    d("acute_cystitis", "Acute cystitis"),
    d("acute_pyelonephritis", "Acute pyelonephritis"),
    d("ureteral_calculus", "Ureteral calculus"),
    d("post_streptococcal_gn", "Acute post-streptococcal glomerulonephritis"),
    d("nephrotic_syndrome", "Nephrotic syndrome"),
    d("chronic_kidney_disease", "Chronic kidney disease"),
    d("acute_kidney_injury", "Acute kidney injury"),
    d("benign_prostatic_hyperplasia", "Benign prostatic hyperplasia"),
    // Endocrine and metabolic
    d("type2_diabetes", "Type 2 diabetes mellitus"),
    d("diabetic_ketoacidosis", "Diabetic ketoacidosis"),
    d("hypoglycemia", "Drug-induced hypoglycemia"),
    d("graves_disease", "Graves' disease"),
    d("hypothyroidism", "Primary hypothyroidism"),
    d("cushings_syndrome", "Cushing's syndrome"),
    d("primary_aldosteronism", "Primary aldosteronism"),
    d("gout", "Acute gouty arthritis"),
    // Hematology
    d("iron_deficiency_anemia", "Iron deficiency anemia"),
    d("megaloblastic_anemia", "Megaloblastic anemia"),
    d("aplastic_anemia", "Aplastic anemia"),
    d("acute_myeloid_leukemia", "Acute myeloid leukemia"),
    d("dlbcl", "Diffuse large B-cell lymphoma"),
    d("immune_thrombocytopenia", "Immune thrombocytopenia"),
    // Rheumatology
    d("rheumatoid_arthritis", "Rheumatoid arthritis"),
    d("systemic_lupus", "Systemic lupus erythematosus"),
    d("ankylosing_spondylitis", "Ankylosing spondylitis"),
    // Neurology
    d("ischemic_stroke", "Acute ischemic stroke"),
    d("intracerebral_hemorrhage", "Hypertensive intracerebral hemorrhage"),
    d("subarachnoid_hemorrhage", "Subarachnoid hemorrhage"),
    d("transient_ischemic_attack", "Transient ischemic attack"),
    d("migraine", "Migraine without aura"),
    d("epilepsy", "Generalized tonic-clonic epilepsy"),
    d("bacterial_meningitis", "Acute bacterial meningitis"),
    d("viral_encephalitis", "Viral encephalitis"),
    d("parkinsons_disease", "Parkinson's disease"),
    d("guillain_barre", "Guillain-Barré syndrome"),
    d("myasthenia_gravis", "Myasthenia gravis"),
    d("bells_palsy", "Bell's palsy"),
    // Psychiatry
    d("major_depression", "Major depressive disorder"),
    d("generalized_anxiety", "Generalized anxiety disorder"),
    // Infectious disease and dermatology
    d("cellulitis", "Lower-limb cellulitis"),
    d("herpes_zoster", "Herpes zoster"),
    d("infectious_mononucleosis", "Infectious mononucleosis"),
    d("urosepsis", "Sepsis of urinary origin"),
    d("dengue_fever", "Dengue fever"),
    d("falciparum_malaria", "Plasmodium falciparum malaria"),
    // Emergency and toxicology
    d("organophosphate_poisoning", "Acute organophosphate poisoning"),
    d("carbon_monoxide_poisoning", "Carbon monoxide poisoning"),
    d("heat_stroke", "Heat stroke"),
    d("anaphylaxis", "Anaphylaxis"),
    d("rhabdomyolysis", "Exertional rhabdomyolysis"),
    // Obstetrics, gynecology and urology
    d("ectopic_pregnancy", "Ruptured ectopic pregnancy"),
    d("pelvic_inflammatory_disease", "Pelvic inflammatory disease"),
    d("ovarian_torsion", "Ovarian torsion"),
    d("preeclampsia", "Preeclampsia with severe features"),
    d("testicular_torsion", "Testicular torsion"),
    // ENT and musculoskeletal
    d("acute_otitis_media", "Acute otitis media"),
    d("acute_sinusitis", "Acute bacterial rhinosinusitis"),
    d("peritonsillar_abscess", "Peritonsillar abscess"),
    d("vertebral_compression_fracture", "Osteoporotic vertebral compression fracture"),
    d("lumbar_disc_herniation", "Lumbar disc herniation"),
];

/// Look up a disease by identifier.
pub fn disease(id: &str) -> Result<&'static Disease, CoreError> {
    DISEASES
        .iter()
        .find(|d| d.id == id)
        .ok_or_else(|| CoreError::UnknownDisease(id.to_string()))
}
