mod ollama;
mod openai;
mod parse;
mod settings;

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::time::sleep;
use tracing::warn;

use crate::risk::LlmJudgment;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use parse::parse_judgment;
pub use settings::{LlmFileConfig, LlmSettings, ProviderKind};

const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(5);
const MAX_POSTING_CHARS: usize = 6000;

pub(crate) const PROMPT_TEMPLATE: &str = "You are an AI assistant that detects fraudulent job postings.

Analyze the following job posting for potential fraud indicators.
Consider:
- Unrealistic salary or perks
- Urgency or pressure tactics
- Poor grammar or vague job roles
- Requests for payment or personal info
- Suspicious or missing company details

Return your response STRICTLY in the following JSON format:

{
  \"risk_score\": <integer between 0 and 100>,
  \"risk_level\": \"<Low|Medium|High>\",
  \"verdict\": \"<legitimate|fraudulent>\",
  \"red_flags\": [<list of short risk indicators>],
  \"reasoning\": \"<one-sentence summary>\"
}

Job Posting:
";

/// Client abstraction for asking a language model to judge a posting.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Produce a judgment for the raw posting text. Unparsable output still
    /// yields a judgment whose reasoning is the raw text.
    async fn judge(&self, posting: &str) -> Result<LlmJudgment>;
}

/// Client that never calls a model and returns an empty reasoning.
#[derive(Debug, Default, Clone)]
pub struct NoopLlmClient;

#[async_trait]
impl LlmClient for NoopLlmClient {
    async fn judge(&self, _posting: &str) -> Result<LlmJudgment> {
        Ok(LlmJudgment::default())
    }
}

/// Instantiate the client selected by the settings.
pub fn build_client(settings: &LlmSettings) -> Result<Arc<dyn LlmClient>> {
    Ok(match settings.provider {
        ProviderKind::Noop => Arc::new(NoopLlmClient),
        ProviderKind::OpenAi => Arc::new(OpenAiClient::new(settings)?),
        ProviderKind::Ollama => Arc::new(OllamaClient::new(settings)?),
    })
}

pub(crate) fn render_prompt(posting: &str) -> String {
    format!("{PROMPT_TEMPLATE}{}\n", truncate(posting, MAX_POSTING_CHARS))
}

fn truncate(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    input.chars().take(max_chars).collect::<String>() + "…"
}

/// Statuses worth another attempt: server errors, timeouts and rate limits.
fn is_transient(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

/// Send a request, retrying transport errors and transient statuses with
/// exponential backoff. Other client errors fail on the first attempt.
pub(crate) async fn send_with_retry(
    request: RequestBuilder,
    max_retries: u32,
    provider: &str,
) -> Result<Response> {
    let mut attempt = 0u32;
    let mut backoff = INITIAL_BACKOFF;
    loop {
        let pending = request
            .try_clone()
            .ok_or_else(|| anyhow!("{provider} request cannot be retried"))?;
        match pending.send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                if attempt >= max_retries || !is_transient(response.status()) {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    bail!("{provider} API error ({status}): {body}");
                }
                warn!(%provider, status = %response.status(), attempt, "retrying LLM request");
            }
            Err(err) => {
                if attempt >= max_retries {
                    return Err(err).with_context(|| format!("failed to call {provider} API"));
                }
                warn!(%provider, error = %err, attempt, "retrying LLM request");
            }
        }
        sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
        attempt += 1;
    }
}
