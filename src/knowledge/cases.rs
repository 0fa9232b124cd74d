use serde::{Deserialize, Serialize};

use super::index::IndexText;

/// Example phrases shown to users as "similar past cases".
pub const TRAINING_CASES: &[(&str, &str)] = &[
    ("Chest pain radiating to left arm", "Cardiology"),
    ("Shortness of breath and chest tightness", "Pulmonology"),
    ("Frequent urination and burning sensation", "Urology"),
    ("Skin rash with itching and redness", "Dermatology"),
    ("Severe headache and dizziness", "Neurology"),
    ("Joint pain and swelling", "Orthopedics"),
    ("Fever and persistent cough", "General Medicine"),
    ("Abdominal pain and vomiting", "Gastroenterology"),
    ("Irregular heartbeat and palpitations", "Cardiology"),
    ("Seizure episode and confusion", "Neurology"),
];


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingCase {
    pub text: String,
    pub department: String,
}

impl IndexText for TrainingCase {
    fn index_text(&self) -> &str {
        &self.text
    }
}


pub fn default_training_cases() -> Vec<TrainingCase> {
    TRAINING_CASES
        .iter()
        .map(|(text, department)| TrainingCase {
            text: text.to_string(),
            department: department.to_string(),
        })
        .collect()
}
