use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::{LlmProvider, LlmProviderError, Message, Prompt, Reply};


#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    stream: bool,
    options: Sampling,
}

#[derive(Debug, Serialize)]
struct Sampling {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    message: Option<ReplyMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}


/// Local chat model served by Ollama's `/api/chat`, used as the assistant
/// fallback or as the primary when no hosted key is available.
pub struct OllamaProvider {
    chat_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    client: Client,
}

impl OllamaProvider {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        temperature: f64,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, LlmProviderError> {
        let chat_url = format!("{}/api/chat", base_url.trim_end_matches('/'));
        let model = model.into();
        info!("Ollama chat ready (model={}, url={})", model, chat_url);

        let client = Client::builder().timeout(Duration::from_secs(timeout_secs)).build()?;
        Ok(Self {
            chat_url,
            model,
            temperature,
            max_tokens,
            client,
        })
    }

    fn body<'a>(&'a self, prompt: &Prompt<'a>) -> ChatBody<'a> {
        ChatBody {
            model: &self.model,
            messages: prompt.messages(),
            stream: false,
            options: Sampling {
                temperature: self.temperature,
                num_predict: prompt.max_tokens(self.max_tokens),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, prompt: Prompt<'_>) -> Result<Reply, LlmProviderError> {
        debug!("Ollama {} request (budget={})", prompt.kind, prompt.max_tokens(self.max_tokens));

        let reply: ChatReply = self
            .client
            .post(&self.chat_url)
            .json(&self.body(&prompt))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match reply {
            ChatReply { error: Some(error), .. } => Err(LlmProviderError::Provider(error)),
            ChatReply { message, .. } => Ok(Reply::new(
                message.map(|m| m.content).unwrap_or_default(),
                "ollama",
            )),
        }
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
