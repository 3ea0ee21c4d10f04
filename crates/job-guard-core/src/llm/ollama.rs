use super::{parse_judgment, render_prompt, send_with_retry, LlmClient, LlmSettings};
use crate::risk::LlmJudgment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3";

/// Client for a local Ollama server's `/api/chat` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    url: String,
    model: String,
    max_retries: u32,
}

impl OllamaClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let base = settings.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let url = format!("{}/api/chat", base.trim_end_matches('/'));
        let http = Client::builder()
            .user_agent("job-guard/0.3")
            .timeout(settings.timeout())
            .build()
            .context("failed to build Ollama HTTP client")?;
        Ok(Self {
            http,
            url,
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_retries: settings.max_retries,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    #[instrument(name = "ollama_judge", skip(self, posting), fields(model = %self.model))]
    async fn judge(&self, posting: &str) -> Result<LlmJudgment> {
        let payload = OllamaChatRequest {
            model: &self.model,
            messages: vec![OllamaMessage {
                role: "user",
                content: render_prompt(posting),
            }],
            stream: false,
            options: OllamaOptions { temperature: 0.1 },
        };

        let request = self.http.post(&self.url).json(&payload);
        let response = send_with_retry(request, self.max_retries, "Ollama").await?;
        let chat: OllamaChatResponse = response
            .json()
            .await
            .context("failed to parse Ollama response")?;

        let judgment = parse_judgment(&chat.message.content);
        debug!(risk_score = ?judgment.risk_score, verdict = ?judgment.verdict, "LLM judgment received");
        Ok(judgment)
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}
