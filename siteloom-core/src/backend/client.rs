//! HTTP client for the generation backend

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::types::GenerationVersion;

use super::session::GenerationStream;

/// System instruction fixed for every request. Tells the model how to label
/// files so the extraction stages in [`crate::parse`] can find them, and to
/// always include an entry document.
const SYSTEM_PROMPT: &str = "\
You are an expert web developer. You can return multiple files in a single response. \
You are encouraged to provide a detailed explanation of your changes.

To ensure the system can extract your files correctly, please use one of these two methods:
1. Custom tags: Wrap the filename in [FILENAME]filename.ext[/FILENAME] tags, followed by the file content.
2. Markdown: Use standard markdown code blocks and optionally specify the filename on the first line or in a comment.

Always include an 'index.html' file as the entry point for the application.";

/// One chat message in the request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Request body for the generation endpoint.
#[derive(Serialize)]
struct GenerationRequest<'a> {
    messages: &'a [ChatMessage],
    model: &'a str,
}

/// HTTP client for the generation backend.
pub struct BackendClient {
    config: BackendConfig,
    http_client: reqwest::Client,
    endpoint: String,
}

impl BackendClient {
    /// Create a new client from configuration.
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.validate()?;

        let endpoint = config
            .endpoint()
            .ok_or_else(|| Error::Config("backend endpoint is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Direct provider calls carry the bearer key; relay calls omit it
        if config.proxy_url.is_none() {
            if let Some(api_key) = &config.api_key {
                let auth_value = format!("Bearer {}", api_key);
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&auth_value)
                        .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
                );
            }
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            endpoint,
        })
    }

    /// The model identifier sent with each request.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the conversational context for a new prompt.
    ///
    /// One system instruction, one assistant message per prior version
    /// (preferring the stored raw response, else reconstructing an
    /// equivalent labeled form from the stored entry code), then the new
    /// user message.
    pub fn build_messages(&self, prompt: &str, history: &[GenerationVersion]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT.to_string(),
        });

        for version in history {
            let content = if !version.raw_response.is_empty() {
                version.raw_response.clone()
            } else {
                let code = version.entry_code().unwrap_or("");
                if code.contains("[FILENAME]") {
                    code.to_string()
                } else {
                    format!("[FILENAME]index.html[/FILENAME]\n{}", code)
                }
            };
            messages.push(ChatMessage {
                role: "assistant",
                content,
            });
        }

        messages.push(ChatMessage {
            role: "user",
            content: prompt.to_string(),
        });
        messages
    }

    /// Open a generation request and return the snapshot stream.
    ///
    /// A non-success response status fails here, before any snapshot is
    /// produced. Transport failures mid-stream surface through the stream
    /// itself, after whatever snapshots were already delivered.
    pub async fn start_generation(
        &self,
        prompt: &str,
        history: &[GenerationVersion],
    ) -> Result<GenerationStream> {
        let messages = self.build_messages(prompt, history);
        let body = GenerationRequest {
            messages: &messages,
            model: &self.config.model,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.config.model,
            history_len = history.len(),
            "Starting generation request"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Generation(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        Ok(GenerationStream::from_response(response))
    }
}
