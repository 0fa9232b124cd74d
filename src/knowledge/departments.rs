use serde::{Deserialize, Serialize};

use super::index::IndexText;

/// Versioned department knowledge table: specialty name and the description
/// whose embedding represents it in the index.
pub const DEPARTMENT_TABLE: &[(&str, &str)] = &[
    (
        "Emergency Medicine",
        "Life threatening conditions including cardiac arrest, stroke, severe trauma, heavy bleeding, respiratory failure.",
    ),
    (
        "General Medicine",
        "Common illnesses including fever, fatigue, infections, general weakness, non-specific symptoms.",
    ),
    (
        "Cardiology",
        "Heart related disorders including chest pain, heart attack, arrhythmia, hypertension, coronary artery disease.",
    ),
    (
        "Neurology",
        "Brain and nervous system disorders including stroke, seizures, migraine, neuropathy, paralysis.",
    ),
    (
        "Dermatology",
        "Skin diseases including rash, eczema, acne, fungal infection, psoriasis.",
    ),
    (
        "Orthopedics",
        "Bone and joint disorders including fractures, arthritis, joint pain, spine injury.",
    ),
    (
        "Pediatrics",
        "Medical care for infants and children including childhood infections and growth issues.",
    ),
    (
        "Psychiatry",
        "Mental health conditions including depression, anxiety, bipolar disorder, hallucinations.",
    ),
    (
        "Gastroenterology",
        "Digestive system disorders including abdominal pain, vomiting, diarrhea, liver disease.",
    ),
    (
        "Pulmonology",
        "Respiratory diseases including asthma, pneumonia, breathing difficulty, chronic cough.",
    ),
    (
        "Urology",
        "Urinary tract disorders including kidney stones, urinary infections, prostate issues.",
    ),
    (
        "Nephrology",
        "Kidney related diseases including renal failure, dialysis conditions, electrolyte imbalance.",
    ),
    (
        "Endocrinology",
        "Hormonal disorders including diabetes, thyroid disease, metabolic syndrome.",
    ),
    (
        "Oncology",
        "Cancer related conditions including tumor growth, chemotherapy, radiation therapy.",
    ),
    (
        "ENT",
        "Ear, nose and throat disorders including sinusitis, hearing loss, throat infections.",
    ),
    (
        "Ophthalmology",
        "Eye related diseases including vision loss, cataract, glaucoma, eye infection.",
    ),
    (
        "Gynecology",
        "Female reproductive health including menstrual disorders, ovarian cyst, pelvic pain.",
    ),
];


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentEntry {
    pub name: String,
    pub description: String,
}

impl DepartmentEntry {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl IndexText for DepartmentEntry {
    fn index_text(&self) -> &str {
        &self.description
    }
}


pub fn default_departments() -> Vec<DepartmentEntry> {
    DEPARTMENT_TABLE
        .iter()
        .map(|(name, description)| DepartmentEntry::new(*name, *description))
        .collect()
}
