use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::{LlmProvider, LlmProviderError, Message, Prompt, Reply};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";


#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}


/// Chat completions against Groq or any OpenAI-compatible endpoint.
pub struct GroqProvider {
    api_key: String,
    completions_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    client: Client,
}

impl GroqProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: impl Into<String>,
        temperature: f64,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, LlmProviderError> {
        let model = model.into();
        let base_url = base_url.as_deref().unwrap_or(GROQ_BASE_URL).trim_end_matches('/');
        let completions_url = format!("{}/chat/completions", base_url);
        info!("Groq chat ready (model={}, url={})", model, completions_url);

        Ok(Self {
            api_key: api_key.into(),
            completions_url,
            model,
            temperature,
            max_tokens,
            client: Client::builder().timeout(Duration::from_secs(timeout_secs)).build()?,
        })
    }

    fn body<'a>(&'a self, prompt: &Prompt<'a>) -> CompletionBody<'a> {
        CompletionBody {
            model: &self.model,
            messages: prompt.messages(),
            temperature: self.temperature,
            max_tokens: prompt.max_tokens(self.max_tokens),
        }
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    async fn complete(&self, prompt: Prompt<'_>) -> Result<Reply, LlmProviderError> {
        debug!("Groq {} request (budget={})", prompt.kind, prompt.max_tokens(self.max_tokens));

        let reply: CompletionReply = self
            .client
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(&self.body(&prompt))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = reply
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmProviderError::Provider("No choices in response".to_string()))?
            .message
            .content
            .unwrap_or_default();

        Ok(Reply::new(text, "groq"))
    }

    fn provider_name(&self) -> &str {
        "groq"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
