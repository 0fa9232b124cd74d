use serde::{Deserialize, Serialize};

const DEFAULT_AGE: u32 = 30;
const DEFAULT_SYSTOLIC_BP: f64 = 120.0;
const DEFAULT_DIASTOLIC_BP: f64 = 80.0;
const DEFAULT_HEART_RATE: f64 = 72.0;
const DEFAULT_TEMPERATURE: f64 = 37.0;

/// Per-request vitals and free-text symptoms. Every field has a stated
/// default so partial payloads deserialize to a well-defined snapshot.
/// A reading of 0 for heart rate or blood pressure means "not supplied".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VitalsPayload")]
pub struct VitalsSnapshot {
    pub age: u32,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub heart_rate: f64,
    /// Degrees Celsius.
    pub temperature: f64,
    pub oxygen_saturation: Option<f64>,
    pub symptoms: String,
}

impl Default for VitalsSnapshot {
    fn default() -> Self {
        Self {
            age: DEFAULT_AGE,
            systolic_bp: DEFAULT_SYSTOLIC_BP,
            diastolic_bp: DEFAULT_DIASTOLIC_BP,
            heart_rate: DEFAULT_HEART_RATE,
            temperature: DEFAULT_TEMPERATURE,
            oxygen_saturation: None,
            symptoms: String::new(),
        }
    }
}

/// Wire shape of a snapshot. Absent and `null` fields both fall back to
/// the stated default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VitalsPayload {
    #[serde(alias = "Age")]
    age: Option<u32>,
    #[serde(alias = "Systolic_BP")]
    systolic_bp: Option<f64>,
    #[serde(alias = "Diastolic_BP")]
    diastolic_bp: Option<f64>,
    #[serde(alias = "Heart_Rate")]
    heart_rate: Option<f64>,
    #[serde(alias = "Temperature")]
    temperature: Option<f64>,
    #[serde(alias = "SpO2", alias = "Oxygen_Saturation")]
    oxygen_saturation: Option<f64>,
    #[serde(alias = "Symptoms")]
    symptoms: Option<String>,
}

impl From<VitalsPayload> for VitalsSnapshot {
    fn from(payload: VitalsPayload) -> Self {
        Self {
            age: payload.age.unwrap_or(DEFAULT_AGE),
            systolic_bp: payload.systolic_bp.unwrap_or(DEFAULT_SYSTOLIC_BP),
            diastolic_bp: payload.diastolic_bp.unwrap_or(DEFAULT_DIASTOLIC_BP),
            heart_rate: payload.heart_rate.unwrap_or(DEFAULT_HEART_RATE),
            temperature: payload.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            oxygen_saturation: payload.oxygen_saturation,
            symptoms: payload.symptoms.unwrap_or_default(),
        }
    }
}

impl VitalsSnapshot {
    pub fn with_symptoms(symptoms: impl Into<String>) -> Self {
        Self {
            symptoms: symptoms.into(),
            ..Default::default()
        }
    }

    /// Number of non-empty comma-separated symptom tokens.
    pub fn symptom_count(&self) -> usize {
        self.symptoms
            .split(',')
            .filter(|token| !token.trim().is_empty())
            .count()
    }
}
