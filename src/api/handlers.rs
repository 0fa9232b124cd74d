use axum::Json;
use axum::extract::{Query, State};
use tracing::{info, warn};

use super::error::ApiError;
use super::types::{
    AppState, ChatRequest, ChatResponse, ExplainRequest, ExplainResponse, HealthResponse, HospitalQuery,
    HospitalResponse, LocationRequest, PredictRequest, PredictResponse, TriageResponse,
};
use crate::llm::assistant::{ExplanationInput, MedicalAssistant};
use crate::storage::{AnalyticsSummary, PredictionRecord};
use crate::triage::{DepartmentScore, Provenance, Screening, VitalsSnapshot};
use crate::utils::safe_truncate_ellipsis;


pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let reason = state.engine.unavailable_reason().await;
    Json(HealthResponse {
        status: if reason.is_none() { "ok" } else { "degraded" },
        models_loaded: reason.is_none(),
        classifier_loaded: state.engine.has_classifier(),
        assistant_enabled: state.assistant.is_some(),
        detail: reason,
    })
}


pub async fn predict(State(state): State<AppState>, Json(request): Json<PredictRequest>) -> Json<PredictResponse> {
    let symptoms = request.symptoms.trim();

    let recommendation = match state.engine.screen(symptoms).await {
        Screening::Emergency(hit) => {
            warn!(
                "Emergency guard triggered for '{}' (phrase='{}', similarity={:.3})",
                safe_truncate_ellipsis(symptoms, 80),
                hit.phrase,
                hit.similarity
            );
            let provenance = state.engine.mode();
            log_prediction(&state, symptoms, Vec::new(), true, provenance).await;
            return Json(PredictResponse::emergency(hit, provenance));
        }
        Screening::Routine(recommendation) => recommendation,
    };

    log_prediction(
        &state,
        symptoms,
        recommendation.departments.clone(),
        false,
        recommendation.provenance,
    )
    .await;

    Json(PredictResponse::from(recommendation))
}

/// Persistence failures never fail the request.
async fn log_prediction(
    state: &AppState,
    symptoms: &str,
    departments: Vec<DepartmentScore>,
    emergency: bool,
    provenance: Provenance,
) {
    let store = state.store.clone();
    let record = PredictionRecord {
        symptoms: symptoms.to_string(),
        departments,
        emergency,
        provenance,
    };

    match tokio::task::spawn_blocking(move || store.record(&record)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("Prediction logging failed: {}", e),
        Err(e) => warn!("Prediction logging task failed: {}", e),
    }
}


pub async fn triage(State(state): State<AppState>, Json(vitals): Json<VitalsSnapshot>) -> Json<TriageResponse> {
    let assessment = state.engine.assess_risk(&vitals).await;
    if assessment.forced {
        info!(
            "Triage override: level={}, triggers={}",
            assessment.level,
            assessment.triggers.len()
        );
    }
    Json(TriageResponse::from(assessment))
}


fn assistant(state: &AppState) -> Result<&MedicalAssistant, ApiError> {
    state.assistant.as_deref().ok_or_else(|| {
        ApiError::Unavailable("AI service unavailable: no language model configured (set GROQ_API_KEY)".to_string())
    })
}

pub async fn explain(
    State(state): State<AppState>,
    Json(request): Json<ExplainRequest>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let assistant = assistant(&state)?;
    if request.symptoms.trim().is_empty() || request.predicted_department.trim().is_empty() {
        return Err(ApiError::Unprocessable(
            "symptoms and predicted_department are required".to_string(),
        ));
    }

    let explanation = assistant
        .explain(&ExplanationInput {
            symptoms: &request.symptoms,
            department: &request.predicted_department,
            risk: request.predicted_risk.as_deref(),
        })
        .await?;

    Ok(Json(ExplainResponse { explanation }))
}

pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Result<Json<ChatResponse>, ApiError> {
    let assistant = assistant(&state)?;
    let message = request
        .content()
        .ok_or_else(|| ApiError::Unprocessable("message/prompt/text/question is required".to_string()))?;

    let response = assistant.chat(message).await?;
    Ok(Json(ChatResponse { response }))
}


pub async fn nearest_hospital(
    State(state): State<AppState>,
    Query(query): Query<HospitalQuery>,
) -> Result<Json<HospitalResponse>, ApiError> {
    let lookup = state.locator.nearest(query.lat, query.lon).await?;
    Ok(Json(HospitalResponse::from(lookup)))
}

pub async fn nearest_hospital_by_body(
    State(state): State<AppState>,
    Json(location): Json<LocationRequest>,
) -> Result<Json<HospitalResponse>, ApiError> {
    let lookup = state.locator.nearest(location.latitude, location.longitude).await?;
    Ok(Json(HospitalResponse::from(lookup)))
}


pub async fn analytics(State(state): State<AppState>) -> Result<Json<AnalyticsSummary>, ApiError> {
    let store = state.store.clone();
    let summary = tokio::task::spawn_blocking(move || store.analytics()).await??;
    Ok(Json(summary))
}
