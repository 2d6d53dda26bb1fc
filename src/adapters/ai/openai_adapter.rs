//! OpenAI-compatible insight adapter.
//!
//! Supports OpenAI API, Azure OpenAI, and local Ollama instances.
//! Maps HTTP outcomes onto `ServiceFailure` so the retrying caller can decide.

use crate::domain::ServiceFailure;
use crate::ports::InsightService;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI-compatible insight adapter.
///
/// Can be configured to work with:
/// - OpenAI API (api.openai.com)
/// - Azure OpenAI
/// - Ollama (localhost)
/// - Any OpenAI-compatible API
pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiAdapter {
    /// Create a new OpenAI adapter.
    ///
    /// # Arguments
    /// * `api_url` - API endpoint (e.g., "https://api.openai.com/v1/chat/completions")
    /// * `api_key` - API key (can be empty for local Ollama)
    /// * `model` - Model name (e.g., "gpt-4o-mini", "llama3.2")
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_url,
            api_key,
            model,
        }
    }

    fn system_prompt() -> &'static str {
        "You are a meeting intelligence assistant for a sales and customer success team. \
         Answer with valid JSON only, exactly in the shape the user asks for. \
         No markdown, no explanations outside JSON."
    }
}

/// OpenAI API request structure.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// OpenAI API response structure.
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

/// Rate limits, timeouts and server errors recover on their own; other
/// non-success statuses mean the request itself is wrong.
fn classify_status(status: StatusCode, body: &str) -> ServiceFailure {
    let message = format!(
        "API error {}: {}",
        status,
        body.chars().take(200).collect::<String>()
    );
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        ServiceFailure::Transient(message)
    } else {
        ServiceFailure::Permanent(message)
    }
}

fn classify_transport(err: &reqwest::Error) -> ServiceFailure {
    if err.is_builder() {
        ServiceFailure::Permanent(format!("invalid request: {}", err))
    } else {
        ServiceFailure::Transient(format!("HTTP request failed: {}", err))
    }
}

/// Pull the first choice's text out of a chat completion envelope.
fn extract_content(body: &str) -> Result<String, ServiceFailure> {
    let chat_response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ServiceFailure::Malformed(format!("Failed to parse API response: {}", e)))?;
    chat_response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| ServiceFailure::Malformed("No response choices returned".to_string()))
}

#[async_trait::async_trait]
impl InsightService for OpenAiAdapter {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceFailure> {
        info!(
            prompt_len = prompt.len(),
            model = %self.model,
            "sending prompt to AI"
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Self::system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.3,
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| classify_transport(&e))?;

        if !status.is_success() {
            warn!(status = %status, body = %body, "AI API returned error");
            return Err(classify_status(status, &body));
        }

        let content = extract_content(&body)?;
        debug!(raw_len = content.len(), "received AI response");
        Ok(content)
    }
}
