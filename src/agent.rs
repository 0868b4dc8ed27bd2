//! LLM agent module for todo summarization.
//!
//! [`Summarizer`] turns an ordered todo list into a digest through any
//! [`TextGenerator`]. [`GeminiGenerator`] talks to the Gemini
//! `generateContent` REST endpoint.

use crate::config::{Config, ConfigError};
use crate::prompt::build_summary_prompt;
use crate::todo::Todo;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Returned instead of calling the model when there is nothing to summarize.
pub const EMPTY_SUMMARY: &str = "No todos to summarize.";

/// Default timeout for LLM requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("LLM API returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("LLM returned no text")]
    EmptyResponse,
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

/// Sent with every summary request.
pub const SUMMARY_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.7,
    top_k: 40,
    top_p: 0.95,
    max_output_tokens: 1024,
};

/// A hosted text-generation model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, SummarizeError>;
}

/// Produces todo digests.
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Summarize the todos in the order given.
    ///
    /// An empty list short-circuits to [`EMPTY_SUMMARY`] without a model call.
    pub async fn summarize(&self, todos: &[Todo]) -> Result<String, SummarizeError> {
        if todos.is_empty() {
            return Ok(EMPTY_SUMMARY.to_string());
        }

        let prompt = build_summary_prompt(todos);
        tracing::info!(
            todo_count = todos.len(),
            prompt_chars = prompt.len(),
            "generating summary"
        );

        let summary = self
            .generator
            .generate(&prompt, &SUMMARY_PARAMS)
            .await
            .inspect_err(|err| tracing::error!(error = %err, "summary generation failed"))?;

        if summary.trim().is_empty() {
            return Err(SummarizeError::EmptyResponse);
        }
        Ok(summary)
    }
}

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Base endpoint URL, without trailing slash.
    pub endpoint: String,
}

impl GeminiConfig {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: config.api_key()?.to_string(),
            model: config.agent.model.clone(),
            endpoint: config.agent.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

/// Gemini `generateContent` client.
pub struct GeminiGenerator {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Result<Self, SummarizeError> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey("gemini".to_string()).into());
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SummarizeError::RequestFailed(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint, self.config.model, self.config.api_key
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

impl From<&GenerationParams> for GenerationConfig {
    fn from(params: &GenerationParams) -> Self {
        Self {
            temperature: params.temperature,
            top_k: params.top_k,
            top_p: params.top_p,
            max_output_tokens: params.max_output_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, SummarizeError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: params.into(),
        };

        let response = self
            .client
            .post(self.url())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(SummarizeError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        extract_text(&text)
    }
}

// The request URL carries the API key, keep it out of error details.
fn transport_error(err: reqwest::Error) -> SummarizeError {
    SummarizeError::RequestFailed(err.without_url().to_string())
}

/// Pull the generated text out of a `generateContent` response body.
fn extract_text(body: &str) -> Result<String, SummarizeError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| SummarizeError::ParseError(format!("{}: {}", e, body)))?;

    if let Some(error) = parsed.error {
        return Err(SummarizeError::RequestFailed(format!(
            "Gemini API error: {}",
            error.message
        )));
    }

    let text: String = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(SummarizeError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::NewTodo;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGenerator {
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        reply: Option<String>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(
            &self,
            prompt: &str,
            params: &GenerationParams,
        ) -> Result<String, SummarizeError> {
            assert_eq!(*params, SUMMARY_PARAMS);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| SummarizeError::RequestFailed("quota exceeded".into()))
        }
    }

    #[tokio::test]
    async fn empty_input_skips_the_model() {
        let generator = Arc::new(RecordingGenerator::default());
        let summarizer = Summarizer::new(generator.clone());

        let summary = summarizer.summarize(&[]).await.unwrap();
        assert_eq!(summary, EMPTY_SUMMARY);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn calls_the_model_once_with_the_prompt() {
        let generator = Arc::new(RecordingGenerator {
            reply: Some("All good.".into()),
            ..Default::default()
        });
        let summarizer = Summarizer::new(generator.clone());
        let todos = vec![Todo::from_new(NewTodo::titled("Pay rent"))];

        let summary = summarizer.summarize(&todos).await.unwrap();
        assert_eq!(summary, "All good.");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(generator.prompts.lock().unwrap()[0], build_summary_prompt(&todos));
    }

    #[tokio::test]
    async fn upstream_failure_is_surfaced() {
        let generator = Arc::new(RecordingGenerator::default());
        let summarizer = Summarizer::new(generator.clone());
        let todos = vec![Todo::from_new(NewTodo::titled("Pay rent"))];

        let err = summarizer.summarize(&todos).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_model_output_is_a_failure() {
        let generator = Arc::new(RecordingGenerator {
            reply: Some("  \n".into()),
            ..Default::default()
        });
        let summarizer = Summarizer::new(generator);
        let todos = vec![Todo::from_new(NewTodo::titled("Pay rent"))];

        assert!(matches!(
            summarizer.summarize(&todos).await,
            Err(SummarizeError::EmptyResponse)
        ));
    }

    #[test]
    fn extracts_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Part one. "},{"text":"Part two."}],"role":"model"}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Part one. Part two.");
    }

    #[test]
    fn api_errors_and_garbage_are_failures() {
        let err = extract_text(r#"{"error":{"code":429,"message":"Resource exhausted"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Resource exhausted"));

        assert!(matches!(
            extract_text("<html>bad gateway</html>"),
            Err(SummarizeError::ParseError(_))
        ));
        assert!(matches!(
            extract_text(r#"{"candidates":[]}"#),
            Err(SummarizeError::EmptyResponse)
        ));
    }

    #[test]
    fn request_body_uses_fixed_params() {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: (&SUMMARY_PARAMS).into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn generator_requires_an_api_key() {
        let result = GeminiGenerator::new(GeminiConfig {
            api_key: " ".into(),
            model: "gemini-2.0-flash".into(),
            endpoint: "http://localhost".into(),
        });
        assert!(matches!(
            result,
            Err(SummarizeError::ConfigError(ConfigError::MissingApiKey(_)))
        ));
    }
}
