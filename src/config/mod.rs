//! Runtime configuration.
//!
//! Precedence, lowest first: compiled defaults, optional TOML file, then
//! environment variables (after `.env` has been loaded by the binary).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QuizError, Result};
use crate::providers::gemini::DEFAULT_GEMINI_MODEL;
use crate::quiz::ValidationPolicy;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub validation: ValidationPolicy,
    pub cache: CacheConfig,
    pub replenish: ReplenishConfig,
    pub retrieval: RetrievalConfig,
    pub gemini: GeminiConfig,
    pub server: ServerConfig,
}

/// Question cache sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of resident questions.
    pub size: usize,
    /// Low-water mark below which the replenisher generates.
    pub min: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { size: 200, min: 100 }
    }
}

/// Replenisher loop intervals, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplenishConfig {
    /// Pause after every generation attempt and after ordinary failures.
    pub normal_backoff_secs: u64,
    /// Pause after an upstream quota failure.
    pub quota_backoff_secs: u64,
    /// Poll interval while the cache is at or above the low-water mark.
    pub idle_poll_secs: u64,
    /// How long shutdown waits for an in-flight cycle before aborting it.
    pub shutdown_grace_secs: u64,
}

impl Default for ReplenishConfig {
    fn default() -> Self {
        Self {
            normal_backoff_secs: 5,
            quota_backoff_secs: 35,
            idle_poll_secs: 2,
            shutdown_grace_secs: 10,
        }
    }
}

impl ReplenishConfig {
    pub fn normal_backoff(&self) -> Duration {
        Duration::from_secs(self.normal_backoff_secs)
    }

    pub fn quota_backoff(&self) -> Duration {
        Duration::from_secs(self.quota_backoff_secs)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_secs(self.idle_poll_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Consumer-side retrieval settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// How long a consumer waits on the cache before generating directly.
    pub take_timeout_secs: u64,
    /// Attempts before giving up on a request.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_delay_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            take_timeout_secs: 10,
            max_attempts: 10,
            retry_delay_secs: 2,
        }
    }
}

impl RetrievalConfig {
    pub fn take_timeout(&self) -> Duration {
        Duration::from_secs(self.take_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Gemini provider settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    /// File holding a replacement instruction payload.
    pub prompt_file: Option<PathBuf>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            bearer_token: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            temperature: 1.0,
            request_timeout_secs: 120,
            prompt_file: None,
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("prompt_file", &self.prompt_file)
            .finish()
    }
}

/// HTTP server settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Secret signing the session cookie. Required to serve.
    pub session_secret: Option<String>,
    /// Questions per quiz.
    pub quiz_length: u32,
    /// Session cookie lifetime.
    pub session_max_age_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
            session_secret: None,
            quiz_length: 10,
            session_max_age_secs: 60 * 60 * 60,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field(
                "session_secret",
                &self.session_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("quiz_length", &self.quiz_length)
            .field("session_max_age_secs", &self.session_max_age_secs)
            .finish()
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Config {
    /// Load defaults, overlay `path` when given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from_path(p)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing sections fall back to defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| QuizError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply environment overrides through `lookup` so tests can supply a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GENAI_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Some(secret) = non_empty("SESSION_SECRET_KEY") {
            self.server.session_secret = Some(secret);
        }
        if let Some(model) = non_empty("CODEQUIZ_MODEL") {
            self.gemini.model = model;
        }
        if let Some(bind) = non_empty("CODEQUIZ_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = non_empty("CODEQUIZ_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache.size == 0 {
            return Err(QuizError::Config("cache.size must be at least 1".into()));
        }
        if self.cache.min > self.cache.size {
            return Err(QuizError::Config(format!(
                "cache.min ({}) exceeds cache.size ({})",
                self.cache.min, self.cache.size
            )));
        }
        if self.retrieval.max_attempts == 0 {
            return Err(QuizError::Config(
                "retrieval.max_attempts must be at least 1".into(),
            ));
        }
        if self.server.quiz_length == 0 {
            return Err(QuizError::Config(
                "server.quiz_length must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The session secret, required by `serve`.
    pub fn session_secret(&self) -> Result<&str> {
        self.server
            .session_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                QuizError::Config(
                    "SESSION_SECRET_KEY is not set; configure a strong value in the environment or .env".into(),
                )
            })
    }
}
