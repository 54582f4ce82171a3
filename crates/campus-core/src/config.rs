use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CampusError, Result};

/// Minimum accepted length, in bytes, of the session signing secret.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Top-level configuration for Campus Guide.
///
/// Loaded from `./campus.toml` by default, then overlaid with environment
/// variables and CLI flags. [`CampusConfig::validate`] must pass before the
/// server starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampusConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

impl CampusConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CampusConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable source.
    ///
    /// Empty values are ignored so that `FOO=` in a `.env` file does not
    /// blank out a configured value.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(secret) = get("SESSION_SECRET") {
            self.session.secret = Some(secret);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(id) = get("MODEL_ID") {
            self.model.id = id;
        }
        if let Some(key) = get("GOOGLE_API_KEY") {
            self.web_search.api_key = Some(key);
        }
        if let Some(cx) = get("GOOGLE_CSE_ID") {
            self.web_search.engine_id = Some(cx);
        }
        if let Some(port) = get("PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
    }

    /// Check that every value the server depends on is present and sane.
    ///
    /// Fails closed: a missing or short session secret refuses startup
    /// instead of falling back to a per-process random key.
    pub fn validate(&self) -> Result<()> {
        match self.session.secret.as_deref() {
            None => {
                return Err(CampusError::Config(
                    "session secret is not set (SESSION_SECRET or [session].secret)".to_string(),
                ))
            }
            Some(secret) if secret.len() < MIN_SESSION_SECRET_LEN => {
                return Err(CampusError::Config(format!(
                    "session secret must be at least {} bytes, got {}",
                    MIN_SESSION_SECRET_LEN,
                    secret.len()
                )))
            }
            Some(_) => {}
        }

        if self.server.port == 0 {
            return Err(CampusError::Config("server port must not be 0".to_string()));
        }
        if self.server.rate_limit_per_sec == 0 {
            return Err(CampusError::Config(
                "server.rate_limit_per_sec must be at least 1".to_string(),
            ));
        }
        if self.session.cookie_name.trim().is_empty()
            || !self
                .session
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CampusError::Config(format!(
                "invalid session cookie name '{}'",
                self.session.cookie_name
            )));
        }

        let url = self.database.url.trim();
        if url.is_empty() {
            return Err(CampusError::Config("database url is empty".to_string()));
        }
        // Only the scheme is echoed; the rest may carry credentials.
        if let Some(scheme) = url_scheme(url).filter(|s| *s != "sqlite") {
            return Err(CampusError::Config(format!(
                "unsupported database scheme '{}': expected a SQLite path or sqlite:// URL",
                scheme
            )));
        }

        if self.model.id.trim().is_empty() {
            return Err(CampusError::Config("model id is empty".to_string()));
        }
        if self.model.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(CampusError::Config(
                "model API key is not set (OPENAI_API_KEY or [model].api_key)".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(CampusError::Config(format!(
                "model temperature {} is outside 0.0..=2.0",
                self.model.temperature
            )));
        }

        if self.web_search.enabled
            && (self.web_search.api_key.is_none() || self.web_search.engine_id.is_none())
        {
            return Err(CampusError::Config(
                "web search is enabled but GOOGLE_API_KEY / GOOGLE_CSE_ID are not set \
                 (set [web_search].enabled = false to run without it)"
                    .to_string(),
            ));
        }

        if self.knowledge.chunk_size == 0 || self.knowledge.chunk_overlap >= self.knowledge.chunk_size
        {
            return Err(CampusError::Config(format!(
                "knowledge chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.knowledge.chunk_overlap, self.knowledge.chunk_size
            )));
        }

        Ok(())
    }
}

/// Scheme of a `scheme://...` URL, if the value is one.
fn url_scheme(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once("://")?;
    let valid = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    pub port: u16,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Requests per second accepted on the JSON endpoints.
    pub rate_limit_per_sec: u64,
    /// Maximum accepted request body in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            log_level: "info".to_string(),
            rate_limit_per_sec: 20,
            body_limit_bytes: 64 * 1024,
        }
    }
}

/// Session cookie settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Key used to sign session cookies. Required.
    pub secret: Option<String>,
    pub cookie_name: String,
    /// Mark the cookie `Secure` (HTTPS only).
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            cookie_name: "campus_session".to_string(),
            secure_cookie: false,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("cookie_name", &self.cookie_name)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

/// Durable store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database location; a `sqlite://` prefix is accepted.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://campus.db".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Filesystem path of the database file.
    pub fn path(&self) -> PathBuf {
        let url = self.url.trim();
        let stripped = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        PathBuf::from(stripped)
    }
}

/// Hosted chat-completions model settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier, e.g. "gpt-4o-mini".
    pub id: String,
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Per-request timeout for the completion call.
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.25,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("id", &self.id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Web search provider settings (Google Custom Search JSON API).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    /// Programmable Search Engine id (`cx`).
    pub engine_id: Option<String>,
    pub base_url: String,
    pub max_results: u32,
    pub timeout_secs: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            engine_id: None,
            base_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            max_results: 5,
            timeout_secs: 15,
        }
    }
}

impl fmt::Debug for WebSearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSearchConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("engine_id", &self.engine_id)
            .field("base_url", &self.base_url)
            .field("max_results", &self.max_results)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Knowledge store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Directory holding the source documents.
    pub data_dir: String,
    /// Chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Chunks retrieved per question.
    pub max_results: u32,
    /// Below this many knowledge hits the web is consulted.
    pub min_hits: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            chunk_size: 1000,
            chunk_overlap: 100,
            max_results: 4,
            min_hits: 2,
        }
    }
}

/// Assistant persona settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Name the assistant introduces itself with.
    pub name: String,
    pub university: String,
    /// Replaces the built-in instructions when set.
    pub instructions_path: Option<String>,
    /// Previous turns of the session sent along with each question.
    pub history_turns: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Virat".to_string(),
            university: "C.V. Raman Global University (CGU), Odisha".to_string(),
            instructions_path: None,
            history_turns: 6,
        }
    }
}
