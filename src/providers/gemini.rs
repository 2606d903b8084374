//! Gemini `generateContent` provider.
//!
//! Auth priority: config key → GENAI_API_KEY → GEMINI_API_KEY → GOOGLE_API_KEY
//! → config bearer token.
//!
//! Thinking models return parts tagged `thought: true`. Those are dropped and
//! only the final text is returned.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::{GenerationError, QuizError, Result};

use super::{parse_provider_error, CompletionProvider};

/// Gemini v1beta REST API base.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-lite";

/// Environment variables consulted for an API key, in order.
const API_KEY_ENV_VARS: [&str; 3] = ["GENAI_API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

// ── Auth ─────────────────────────────────────────────────────────────────────

/// Authentication method for the Gemini REST API.
pub enum GeminiAuth {
    /// Standard API key, sent as `?key=` query parameter.
    ApiKey(String),
    /// OAuth bearer token, sent as `Authorization: Bearer` header.
    BearerToken(String),
}

impl std::fmt::Debug for GeminiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("GeminiAuth::ApiKey([REDACTED])"),
            Self::BearerToken(_) => f.write_str("GeminiAuth::BearerToken([REDACTED])"),
        }
    }
}

impl GeminiAuth {
    /// Resolve auth credentials in priority order. Empty strings are skipped.
    pub fn resolve(
        explicit_key: Option<&str>,
        env_key: Option<&str>,
        bearer_token: Option<&str>,
    ) -> Option<Self> {
        if let Some(k) = explicit_key.filter(|k| !k.is_empty()) {
            return Some(Self::ApiKey(k.to_string()));
        }
        if let Some(k) = env_key.filter(|k| !k.is_empty()) {
            return Some(Self::ApiKey(k.to_string()));
        }
        if let Some(t) = bearer_token.filter(|t| !t.is_empty()) {
            return Some(Self::BearerToken(t.to_string()));
        }
        None
    }

    /// First non-empty API key found in the environment.
    pub fn env_key() -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|v| !v.is_empty())
    }
}

// ── Provider ──────────────────────────────────────────────────────────────────

/// Provider that speaks the Gemini REST API directly.
pub struct GeminiProvider {
    auth: GeminiAuth,
    model: String,
    temperature: f32,
    client: Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("auth", &self.auth)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiProvider {
    /// Build a provider that authenticates with an API key.
    pub fn new_with_key(api_key: &str, model: &str) -> Result<Self> {
        Self::new(
            GeminiAuth::ApiKey(api_key.to_string()),
            model,
            1.0,
            Duration::from_secs(120),
        )
    }

    fn new(auth: GeminiAuth, model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuizError::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            auth,
            model: model.to_string(),
            temperature,
            client,
        })
    }

    /// Build from config, falling back to environment keys.
    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        let env_key = GeminiAuth::env_key();
        let auth = GeminiAuth::resolve(
            config.api_key.as_deref(),
            env_key.as_deref(),
            config.bearer_token.as_deref(),
        )
        .ok_or_else(|| {
            QuizError::Config(
                "no Gemini credentials: set GENAI_API_KEY or gemini.api_key".to_string(),
            )
        })?;
        Self::new(
            auth,
            &config.model,
            config.temperature,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the single-turn `generateContent` request body.
    pub fn build_request_body(&self, prompt: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": self.temperature
            }
        })
    }

    /// Extract final answer text from a Gemini API response.
    ///
    /// Non-thought parts win. If only thought parts exist they are returned
    /// so the caller always gets the model's text when there is any.
    pub fn extract_text(response: &Value) -> Option<String> {
        let parts = response["candidates"][0]["content"]["parts"].as_array()?;

        let final_parts: Vec<&str> = parts
            .iter()
            .filter(|p| !p["thought"].as_bool().unwrap_or(false))
            .filter_map(|p| p["text"].as_str())
            .collect();

        if !final_parts.is_empty() {
            return Some(final_parts.join(""));
        }

        let thought_parts: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();

        if !thought_parts.is_empty() {
            Some(thought_parts.join(""))
        } else {
            None
        }
    }

    /// Pull a readable message out of a Gemini error body.
    ///
    /// Gemini reports quota exhaustion as `error.status = "RESOURCE_EXHAUSTED"`,
    /// so the status string is kept in the message.
    pub fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                let message = v["error"]["message"].as_str()?;
                Some(match v["error"]["status"].as_str() {
                    Some(status) => format!("Gemini API error {status}: {message}"),
                    None => format!("Gemini API error: {message}"),
                })
            })
            .unwrap_or_else(|| format!("Gemini API error: {body}"))
    }

    fn api_url(&self) -> String {
        format!("{}/models/{}:generateContent", GEMINI_API_BASE, self.model)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            GeminiAuth::ApiKey(key) => request.query(&[("key", key.as_str())]),
            GeminiAuth::BearerToken(token) => {
                request.header("Authorization", format!("Bearer {}", token))
            }
        }
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        debug!(model = %self.model, "Gemini generateContent request");

        let request = self
            .client
            .post(self.api_url())
            .header("Content-Type", "application/json")
            .json(&self.build_request_body(prompt));

        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| GenerationError::transport(format!("Gemini request failed: {e}")))?;

        if response.status().is_success() {
            let json: Value = response.json().await.map_err(|e| {
                GenerationError::transport(format!("Failed to read Gemini response: {e}"))
            })?;
            return Ok(Self::extract_text(&json).unwrap_or_default());
        }

        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();
        Err(parse_provider_error(status, &Self::error_message(&error_text)))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
