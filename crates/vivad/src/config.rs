//! Configuration management for vivad.
//!
//! Loads settings from $VIVA_CONFIG or /etc/viva/config.toml, or uses defaults.
//! API keys are never read from the file; see `viva_common::credentials`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::examiner::ExamSettings;
use crate::session::DEFAULT_MAX_SESSIONS;
use viva_common::llm_client::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use viva_common::prompts::DEFAULT_CONTEXT_CHARS;

/// Config file path
pub const CONFIG_PATH: &str = "/etc/viva/config.toml";

/// Environment variable overriding the config path
pub const CONFIG_ENV: &str = "VIVA_CONFIG";

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Largest accepted request body (uploads included)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Upstream generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request HTTP timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Pause after a quota failure before trying the next key
    #[serde(default = "default_rotation_delay")]
    pub rotation_delay_ms: u64,

    /// Pause before question and evaluation calls
    #[serde(default = "default_pre_call_delay")]
    pub pre_call_delay_ms: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_rotation_delay() -> u64 {
    1_000
}

fn default_pre_call_delay() -> u64 {
    2_000
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rotation_delay(&self) -> Duration {
        Duration::from_millis(self.rotation_delay_ms)
    }

    pub fn pre_call_delay(&self) -> Duration {
        Duration::from_millis(self.pre_call_delay_ms)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout(),
            rotation_delay_ms: default_rotation_delay(),
            pre_call_delay_ms: default_pre_call_delay(),
        }
    }
}

/// Exam behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamConfig {
    /// Characters of document text kept as session context
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,

    /// Pages read from an uploaded document
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Topic used when `start` is called without one
    #[serde(default = "default_topic")]
    pub default_topic: String,

    /// Idle time after which a session is dropped
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Sessions held at once; the least recently used is evicted beyond this
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_context_chars() -> usize {
    DEFAULT_CONTEXT_CHARS
}

fn default_max_pages() -> usize {
    5
}

fn default_topic() -> String {
    "General CS".to_string()
}

fn default_session_ttl() -> u64 {
    3_600
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            context_chars: default_context_chars(),
            max_pages: default_max_pages(),
            default_topic: default_topic(),
            session_ttl_secs: default_session_ttl(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Main vivad configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VivaConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub exam: ExamConfig,
}

impl VivaConfig {
    /// Load from $VIVA_CONFIG, then /etc/viva/config.toml, then defaults.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Examiner settings drawn from `[exam]` and `[llm]`.
    pub fn exam_settings(&self) -> ExamSettings {
        ExamSettings {
            context_chars: self.exam.context_chars,
            default_topic: self.exam.default_topic.clone(),
            pre_call_delay: self.llm.pre_call_delay(),
        }
    }

    /// Load from a specific file; any failure falls back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = VivaConfig::default();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.llm.model, "gemini-flash-latest");
        assert_eq!(config.llm.rotation_delay(), Duration::from_secs(1));
        assert_eq!(config.llm.pre_call_delay(), Duration::from_secs(2));
        assert_eq!(config.exam.context_chars, 3000);
        assert_eq!(config.exam.max_pages, 5);
        assert_eq!(config.exam.default_topic, "General CS");

        let settings = config.exam_settings();
        assert_eq!(settings.context_chars, 3000);
        assert_eq!(settings.pre_call_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm]\nmodel = \"gemini-pro\"\n\n[exam]\nmax_pages = 2").unwrap();

        let config = VivaConfig::load_from(file.path());
        assert_eq!(config.llm.model, "gemini-pro");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.exam.max_pages, 2);
        assert_eq!(config.exam.context_chars, 3000);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is = = not toml").unwrap();

        let config = VivaConfig::load_from(file.path());
        assert_eq!(config.server.bind_addr, "127.0.0.1:8000");
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = VivaConfig::load_from(Path::new("/nonexistent/viva.toml"));
        assert_eq!(config.exam.session_ttl_secs, 3600);
        assert_eq!(config.exam.max_sessions, 10_000);
    }
}
