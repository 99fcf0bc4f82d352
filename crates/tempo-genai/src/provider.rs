use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use tempo_core::errors::GenError;

use crate::{parse_tasks, GeneratedTask, TaskGenerator};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-3.5-turbo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates task lists. \
Return only a JSON array of tasks, where each task has a 'title' and 'duration' \
(in minutes) property. Example: [{\"title\": \"Task 1\", \"duration\": 30}, \
{\"title\": \"Task 2\", \"duration\": 15}]";

/// OpenAI chat-completions backed generator.
pub struct OpenAiGenerator {
    client: Client,
    api_key: SecretString,
}

impl OpenAiGenerator {
    pub fn new(api_key: SecretString) -> Result<Self, GenError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GenError::NetworkError(format!("build client: {e}")))?;
        Ok(Self { client, api_key })
    }

    /// Build from `OPENAI_API_KEY`, or None when the variable is unset.
    pub fn from_env() -> Result<Option<Self>, GenError> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(Some(Self::new(key.into())?)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl TaskGenerator for OpenAiGenerator {
    #[instrument(skip(self, prompt), fields(playlist_name, prompt_len = prompt.len()))]
    async fn generate(
        &self,
        playlist_name: &str,
        prompt: &str,
    ) -> Result<Vec<GeneratedTask>, GenError> {
        let body = ChatRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Generate a list of tasks for a playlist named \"{playlist_name}\". \
                         Additional context: {prompt}. Return the response as a JSON array of \
                         tasks, where each task has a title and duration (in minutes)."
                    ),
                },
            ],
            temperature: 0.7,
            max_tokens: 1000,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenError::Timeout(REQUEST_TIMEOUT)
                } else {
                    GenError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = GenError::from_status(status.as_u16(), body);
            warn!(status = status.as_u16(), kind = err.error_kind(), "provider request failed");
            return Err(err);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenError::InvalidResponse(format!("malformed response body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenError::InvalidResponse("no content in response".into()))?;

        let tasks = parse_tasks(&content)?;
        debug!(task_count = tasks.len(), "generated tasks");
        Ok(tasks)
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: &'static str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
