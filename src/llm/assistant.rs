use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::providers::base::{LlmProvider, LlmProviderError, Prompt, PromptKind};
use crate::utils::safe_truncate_ellipsis;


#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("LLM provider failed: {0}")]
    Provider(#[from] LlmProviderError),

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("Message is empty")]
    EmptyMessage,
}


/// Model output explained back to the patient.
#[derive(Debug, Clone)]
pub struct ExplanationInput<'a> {
    pub symptoms: &'a str,
    pub department: &'a str,
    pub risk: Option<&'a str>,
}


/// Explanations and constrained informational chat on top of a chat model.
pub struct MedicalAssistant {
    provider: Arc<dyn LlmProvider>,
}

impl MedicalAssistant {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        info!(
            "Medical assistant ready: provider={}, model={}",
            provider.provider_name(),
            provider.model_name()
        );
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub async fn explain(&self, input: &ExplanationInput<'_>) -> Result<String, AssistantError> {
        let mut user_prompt = format!(
            "Patient Data:\nSymptoms: {}\n\nModel Output:\nRecommended Department: {}",
            input.symptoms, input.department
        );
        if let Some(risk) = input.risk.filter(|r| !r.trim().is_empty()) {
            user_prompt.push_str(&format!("\nRisk Level: {}", risk));
        }

        self.complete(Prompt::new(PromptKind::Explanation, &user_prompt)).await
    }

    pub async fn chat(&self, message: &str) -> Result<String, AssistantError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }
        self.complete(Prompt::new(PromptKind::Chat, message)).await
    }

    async fn complete(&self, prompt: Prompt<'_>) -> Result<String, AssistantError> {
        debug!("Assistant {} prompt: {}", prompt.kind, safe_truncate_ellipsis(prompt.user, 120));

        let reply = self.provider.complete(prompt).await?;
        let text = reply.text.trim();
        if text.is_empty() {
            return Err(AssistantError::EmptyResponse(reply.provider));
        }

        debug!("Assistant reply from {} (fallback={})", reply.provider, reply.fallback_used);
        Ok(text.to_string())
    }
}
