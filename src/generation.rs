//! Generation capability: trait and HTTP-backed providers.
//!
//! Defines the [`Generator`] trait consumed by the answer orchestrator,
//! with concrete implementations:
//! - **[`DisabledGenerator`]** — returns errors; used when generation is
//!   not configured.
//! - **[`GeminiGenerator`]** — calls the Gemini `generateContent` API.
//! - **[`OllamaGenerator`]** — calls a local Ollama instance's
//!   `/api/generate` endpoint (non-streaming).
//!
//! Failures surface as [`RagError::GenerationFailed`] and are never
//! retried here.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::{RagError, Result};

/// The external generative capability: prompt in, completion text out.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Provider identifier used in error messages.
    fn name(&self) -> &str;
}

/// Instantiate the generator selected by configuration.
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "gemini" => Ok(Box::new(GeminiGenerator::new(config)?)),
        "ollama" => Ok(Box::new(OllamaGenerator::new(config)?)),
        other => Err(RagError::Config(format!("unknown generation provider: {}", other))),
    }
}

// ============ Disabled ============

/// A no-op generator that always fails; used when generation is not
/// configured.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::GenerationFailed {
            provider: "disabled".to_string(),
            message: "generation provider is disabled; set [generation] provider in config"
                .to_string(),
        })
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

// ============ Gemini ============

/// Generator backed by the Gemini REST API.
///
/// Calls `POST /v1beta/models/{model}:generateContent` with the API key
/// from the `GEMINI_API_KEY` environment variable.
pub struct GeminiGenerator {
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| RagError::Config("generation.model required for gemini provider".into()))?;

        if std::env::var("GEMINI_API_KEY").is_err() {
            return Err(RagError::Config("GEMINI_API_KEY environment variable not set".into()));
        }

        let base_url = config
            .url
            .clone()
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string());

        Ok(Self {
            model,
            base_url,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn fail(&self, message: impl Into<String>) -> RagError {
        RagError::GenerationFailed {
            provider: "gemini".to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "generating via gemini");

        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| self.fail("GEMINI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| self.fail(e.to_string()))?;

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response = client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(self.fail(format!("API error {}: {}", status, body_text)));
        }

        let json: serde_json::Value =
            response.json().await.map_err(|e| self.fail(e.to_string()))?;
        parse_gemini_response(&json).map_err(|m| self.fail(m))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn parse_gemini_response(json: &serde_json::Value) -> std::result::Result<String, String> {
    let text = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .and_then(|p| p.first())
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| "invalid response: missing candidate text".to_string())?;
    Ok(text.to_string())
}

// ============ Ollama ============

/// Generator backed by a local Ollama instance's `POST /api/generate`.
pub struct OllamaGenerator {
    model: String,
    url: String,
    timeout: Duration,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| RagError::Config("generation.model required for ollama provider".into()))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            model,
            url,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn fail(&self, message: impl Into<String>) -> RagError {
        RagError::GenerationFailed {
            provider: "ollama".to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "generating via ollama");

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| self.fail(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = client
            .post(format!("{}/api/generate", self.url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                self.fail(format!("connection error (is Ollama running at {}?): {}", self.url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(self.fail(format!("API error {}: {}", status, body_text)));
        }

        let json: serde_json::Value =
            response.json().await.map_err(|e| self.fail(e.to_string()))?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(|r| r.to_string())
            .ok_or_else(|| self.fail("invalid response: missing response field"))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
