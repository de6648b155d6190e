/// LLM Client: the single point of entry for all Claude API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// The workflow talks to the `FeedbackClient` trait; `AnthropicFeedbackClient`
/// is the production implementation built on `LlmClient`.
///
/// Model: claude-sonnet-4-5 (hardcoded)
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::storage::{FileStore, FileStoreError};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Could not load resume for analysis: {0}")]
    Resume(#[from] FileStoreError),

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<RequestBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBlock<'a> {
    Text { text: &'a str },
    Document { source: DocumentSource },
}

#[derive(Debug, Serialize)]
pub struct DocumentSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'static str,
    data: String,
}

impl<'a> RequestBlock<'a> {
    /// Attaches a PDF as a base64 document block.
    pub fn pdf(bytes: &[u8]) -> Self {
        RequestBlock::Document {
            source: DocumentSource {
                source_type: "base64",
                media_type: PDF_MEDIA_TYPE,
                data: STANDARD.encode(bytes),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Feedback response shape seen by the workflow
// ────────────────────────────────────────────────────────────────────────────

/// A feedback reply: `{ "message": { "content": ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub message: FeedbackMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackMessage {
    pub content: MessageContent,
}

/// Message content is either a plain string or a list of typed segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Segments(Vec<ContentSegment>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSegment {
    #[serde(rename = "type", default = "default_segment_type")]
    pub segment_type: String,
    pub text: String,
}

fn default_segment_type() -> String {
    "text".to_string()
}

impl MessageContent {
    /// The string itself, or the text of the first segment.
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Segments(segments) => segments.first().map(|s| s.text.as_str()),
        }
    }
}

impl FeedbackResponse {
    pub fn text(&self) -> Option<&str> {
        self.message.content.text()
    }
}

impl From<LlmResponse> for FeedbackResponse {
    fn from(response: LlmResponse) -> Self {
        let segments = response
            .content
            .into_iter()
            .filter_map(|block| {
                block.text.map(|text| ContentSegment {
                    segment_type: block.block_type,
                    text,
                })
            })
            .collect();
        FeedbackResponse {
            message: FeedbackMessage {
                content: MessageContent::Segments(segments),
            },
        }
    }
}

/// Requests AI feedback on a stored resume.
#[async_trait]
pub trait FeedbackClient: Send + Sync {
    /// `resume_path` is the file-store handle of the uploaded PDF.
    async fn feedback(
        &self,
        resume_path: &str,
        instructions: &str,
    ) -> Result<FeedbackResponse, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single LLM client. Wraps the Anthropic Messages API.
/// Calls are made once; failures are returned to the caller without retry.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a raw call to the Claude API with a single user turn.
    pub async fn call(
        &self,
        content: Vec<RequestBlock<'_>>,
        system: Option<&str>,
    ) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }
}

/// Sends the stored resume PDF plus instructions to Claude.
#[derive(Clone)]
pub struct AnthropicFeedbackClient {
    llm: LlmClient,
    files: Arc<dyn FileStore>,
}

impl AnthropicFeedbackClient {
    pub fn new(llm: LlmClient, files: Arc<dyn FileStore>) -> Self {
        Self { llm, files }
    }
}

#[async_trait]
impl FeedbackClient for AnthropicFeedbackClient {
    async fn feedback(
        &self,
        resume_path: &str,
        instructions: &str,
    ) -> Result<FeedbackResponse, LlmError> {
        let pdf = self.files.read(resume_path).await?;

        let response = self
            .llm
            .call(
                vec![RequestBlock::pdf(&pdf), RequestBlock::Text { text: instructions }],
                Some(prompts::JSON_ONLY_SYSTEM),
            )
            .await?;

        if response.text().is_none() {
            return Err(LlmError::EmptyContent);
        }

        Ok(response.into())
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_message_content_plain_string() {
        let json = r#"{"message": {"content": "{\"score\":80}"}}"#;
        let response: FeedbackResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.message.content,
            MessageContent::Text("{\"score\":80}".to_string())
        );
        assert_eq!(response.text(), Some("{\"score\":80}"));
    }

    #[test]
    fn test_message_content_segments_uses_first_text() {
        let json = r#"{"message": {"content": [
            {"type": "text", "text": "first"},
            {"type": "text", "text": "second"}
        ]}}"#;
        let response: FeedbackResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(response.message.content, MessageContent::Segments(_)));
        assert_eq!(response.text(), Some("first"));
    }

    #[test]
    fn test_message_content_empty_segments_has_no_text() {
        let content = MessageContent::Segments(vec![]);
        assert_eq!(content.text(), None);
    }

    #[test]
    fn test_llm_response_converts_to_text_segments() {
        let json = r#"{
            "content": [
                {"type": "thinking"},
                {"type": "text", "text": "{\"overallScore\": 72}"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;
        let llm: LlmResponse = serde_json::from_str(json).unwrap();
        let feedback = FeedbackResponse::from(llm);
        assert_eq!(feedback.text(), Some("{\"overallScore\": 72}"));
    }

    #[test]
    fn test_request_serializes_document_then_text() {
        let request = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: None,
            messages: vec![AnthropicMessage {
                role: "user",
                content: vec![RequestBlock::pdf(b"%PDF"), RequestBlock::Text { text: "rate it" }],
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("system").is_none());
        let content = &value["messages"][0]["content"];
        assert_eq!(content[0]["type"], "document");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "application/pdf");
        assert_eq!(content[0]["source"]["data"], "JVBERg==");
        assert_eq!(content[1]["type"], "text");
        assert_eq!(content[1]["text"], "rate it");
    }
}
