use async_trait::async_trait;
use serde::Serialize;
use strum::{Display, IntoStaticStr};
use thiserror::Error;


#[derive(Error, Debug)]
pub enum LlmProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),
}


const EXPLANATION_SYSTEM_PROMPT: &str = "You are a medical AI explainability assistant.\n\
STRICT RULES:\n\
- Do NOT change the prediction.\n\
- Do NOT diagnose.\n\
- Do NOT suggest treatments.\n\
- Only explain why the given prediction makes sense.\n\
- Output only bullet points.\n\
- Each bullet must start with '- '.\n\
- Maximum 3 bullet points.\n\
- No paragraphs.";

const CHAT_SYSTEM_PROMPT: &str = "You are an informational assistant.\n\
Rules:\n\
- No diagnosis\n\
- No treatment advice\n\
- No emergency instructions\n\
- Use bullet points only\n\
- Stay within medical topics and concepts\n\
- Do not talk about non-medical topics\n\
- Max 5 bullets\n\
- One sentence per bullet";


/// The two assistant tasks. Each fixes its system prompt and reply budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum PromptKind {
    Explanation,
    Chat,
}

impl PromptKind {
    pub fn system_prompt(self) -> &'static str {
        match self {
            PromptKind::Explanation => EXPLANATION_SYSTEM_PROMPT,
            PromptKind::Chat => CHAT_SYSTEM_PROMPT,
        }
    }

    /// Completion tokens requested before the provider's configured ceiling.
    pub fn token_budget(self) -> u32 {
        match self {
            PromptKind::Explanation => 300,
            PromptKind::Chat => 200,
        }
    }
}


/// Role/content pair in the shape shared by Groq and Ollama chat APIs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Message<'a> {
    pub role: &'static str,
    pub content: &'a str,
}


#[derive(Debug, Clone, Copy)]
pub struct Prompt<'a> {
    pub kind: PromptKind,
    pub user: &'a str,
}

impl<'a> Prompt<'a> {
    pub fn new(kind: PromptKind, user: &'a str) -> Self {
        Self { kind, user }
    }

    pub fn messages(&self) -> [Message<'a>; 2] {
        [
            Message {
                role: "system",
                content: self.kind.system_prompt(),
            },
            Message {
                role: "user",
                content: self.user,
            },
        ]
    }

    pub fn max_tokens(&self, ceiling: u32) -> u32 {
        self.kind.token_budget().min(ceiling)
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub provider: String,
    pub fallback_used: bool,
}

impl Reply {
    pub fn new(text: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            fallback_used: false,
        }
    }
}


#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, prompt: Prompt<'_>) -> Result<Reply, LlmProviderError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}
