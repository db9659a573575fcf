use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const SYSTEM_PREAMBLE: &str = "You are Evolve, a helpful AI assistant.";
const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// One-shot text generation against a named model. Errors carry the
/// provider's own description; translating them into execution state is the
/// engine's job, not the client's.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, input_text: &str, model: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageOwned,
}

#[derive(Deserialize)]
struct ChatMessageOwned {
    content: String,
}

pub struct OpenAiClient {
    api_key: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, input_text: &str, model: &str) -> Result<String> {
        let req = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PREAMBLE,
                },
                ChatMessage {
                    role: "user",
                    content: input_text,
                },
            ],
            max_tokens: 1000,
            temperature: 0.7,
        };
        let res = self
            .client
            .post(COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "OpenAI API Error: {}",
                res.text().await.unwrap_or_default()
            ));
        }
        let parsed: ChatResponse = res.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("OpenAI API returned no choices"))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Canned client for exercising the engine without network access.
    pub enum MockLlm {
        Respond(String),
        Fail(String),
    }

    #[async_trait]
    impl LlmClient for MockLlm {
        async fn generate(&self, _input_text: &str, _model: &str) -> Result<String> {
            match self {
                MockLlm::Respond(text) => Ok(text.clone()),
                MockLlm::Fail(reason) => Err(anyhow!("{reason}")),
            }
        }
    }
}
