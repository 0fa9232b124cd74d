use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geo::{Hospital, HospitalLocator, HospitalLookup};
use crate::llm::assistant::MedicalAssistant;
use crate::storage::PredictionStore;
use crate::triage::{
    DepartmentScore, EmergencyMatch, OverrideTrigger, Provenance, Recommendation, RiskAssessment, RiskLevel,
    RiskPolicy, SimilarCase, TriageEngine,
};
use crate::utils::round2;

pub const EMERGENCY_MESSAGE: &str = "Possible medical emergency. Please seek immediate care.";


/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TriageEngine>,
    pub assistant: Option<Arc<MedicalAssistant>>,
    pub locator: Arc<HospitalLocator>,
    pub store: PredictionStore,
}


#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default, alias = "Symptoms")]
    pub symptoms: String,
}


#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub emergency: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_match: Option<EmergencyMatch>,
    pub provenance: Provenance,
    pub recommendations: Vec<DepartmentScore>,
    pub similar_cases: Vec<SimilarCase>,
}

impl PredictResponse {
    pub fn emergency(hit: EmergencyMatch, provenance: Provenance) -> Self {
        Self {
            emergency: true,
            message: Some(EMERGENCY_MESSAGE),
            emergency_match: Some(EmergencyMatch {
                similarity: round2(hit.similarity),
                ..hit
            }),
            provenance,
            recommendations: Vec::new(),
            similar_cases: Vec::new(),
        }
    }
}

impl From<Recommendation> for PredictResponse {
    fn from(rec: Recommendation) -> Self {
        Self {
            emergency: false,
            message: None,
            emergency_match: None,
            provenance: rec.provenance,
            recommendations: rec
                .departments
                .into_iter()
                .map(|d| DepartmentScore::new(d.department, round2(d.confidence_percent)))
                .collect(),
            similar_cases: rec
                .similar_cases
                .into_iter()
                .map(|c| SimilarCase {
                    distance: round2(f64::from(c.distance)) as f32,
                    ..c
                })
                .collect(),
        }
    }
}


#[derive(Debug, Serialize)]
pub struct TriageResponse {
    pub risk_level: RiskLevel,
    pub forced: bool,
    pub triggers: Vec<OverrideTrigger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub policy: RiskPolicy,
}

impl From<RiskAssessment> for TriageResponse {
    fn from(assessment: RiskAssessment) -> Self {
        Self {
            risk_level: assessment.level,
            forced: assessment.forced,
            triggers: assessment.triggers,
            score: assessment.score.map(round2),
            policy: assessment.policy,
        }
    }
}


#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub predicted_department: String,
    #[serde(default)]
    pub predicted_risk: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub explanation: String,
}


#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub prompt: Option<String>,
    pub text: Option<String>,
    pub question: Option<String>,
}

impl ChatRequest {
    /// First non-blank of message, prompt, text, question.
    pub fn content(&self) -> Option<&str> {
        [&self.message, &self.prompt, &self.text, &self.question]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}


#[derive(Debug, Deserialize)]
pub struct HospitalQuery {
    pub lat: f64,
    pub lon: f64,
}

/// JSON body accepted by `POST /nearest-hospital`.
#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon")]
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct HospitalResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital: Option<Hospital>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<HospitalLookup> for HospitalResponse {
    fn from(lookup: HospitalLookup) -> Self {
        match lookup {
            HospitalLookup::Found(hospital) => Self {
                found: true,
                hospital: Some(Hospital {
                    distance_km: round2(hospital.distance_km),
                    ..hospital
                }),
                message: None,
            },
            HospitalLookup::NotFound { reason } => Self {
                found: false,
                hospital: None,
                message: Some(reason),
            },
        }
    }
}


#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub models_loaded: bool,
    pub classifier_loaded: bool,
    pub assistant_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
