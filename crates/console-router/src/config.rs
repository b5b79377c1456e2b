//! Configuration for the router and its backend clients
//!
//! Loaded from TOML. The environment is consulted only through
//! [`ConsoleConfig::apply_env`], which the CLI calls once at startup; the
//! router itself receives the resolved value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::backend::BackendKind;
use crate::error::{ConsoleError, Result};

/// Environment variable toggling local mode
pub const ENV_LOCAL: &str = "CONSOLE_LOCAL";
/// Environment variable holding comma-separated mocked endpoint prefixes
pub const ENV_MOCKED_ENDPOINTS: &str = "CONSOLE_MOCKED_ENDPOINTS";

const DEFAULT_BASE_URL: &str = "http://localhost:8080/";
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Connection settings for one backend client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Base URL every request path is joined onto
    pub base_url: String,
    /// Static bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    /// Whole-request timeout. Unset means the client never times out,
    /// which the event stream relies on.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Extra default headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            connect_timeout_ms: None,
            request_timeout_ms: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(
            self.connect_timeout_ms
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// The four backend surfaces
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendsConfig {
    #[serde(default)]
    pub primary: BackendConfig,
    #[serde(default)]
    pub auth: BackendConfig,
    #[serde(default)]
    pub staged: BackendConfig,
    #[serde(default)]
    pub mocked: BackendConfig,
}

impl BackendsConfig {
    pub fn get(&self, kind: BackendKind) -> &BackendConfig {
        match kind {
            BackendKind::Primary => &self.primary,
            BackendKind::Auth => &self.auth,
            BackendKind::Staged => &self.staged,
            BackendKind::Mocked => &self.mocked,
        }
    }
}

/// Top-level console configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConsoleConfig {
    /// Local deployment: "prod" keys are served by the mocked backend
    #[serde(default)]
    pub local: bool,
    /// First-token prefixes always served by the mocked backend
    #[serde(default)]
    pub mocked_endpoints: Vec<String>,
    #[serde(default)]
    pub backends: BackendsConfig,
}

impl ConsoleConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConsoleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConsoleError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            ConsoleError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load configuration from the default config file, or defaults when absent
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Default config file path
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| ConsoleError::Config("Could not determine config directory".into()))?
            .join("console-cli");
        Ok(dir.join("config.toml"))
    }

    /// Override local mode and mocked endpoints from the process environment
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(ENV_LOCAL) {
            match parse_flag(&value) {
                Some(flag) => self.local = flag,
                None => tracing::warn!("Ignoring {}={:?}: not a boolean", ENV_LOCAL, value),
            }
        }
        if let Ok(value) = std::env::var(ENV_MOCKED_ENDPOINTS) {
            self.mocked_endpoints = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Check that every backend has an absolute http(s) base URL
    pub fn validate(&self) -> Result<()> {
        for kind in BackendKind::ALL {
            let base = &self.backends.get(kind).base_url;
            let url = Url::parse(base)
                .map_err(|e| ConsoleError::Config(format!("{} base_url {:?}: {}", kind, base, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConsoleError::Config(format!(
                    "{} base_url {:?}: unsupported scheme {}",
                    kind,
                    base,
                    url.scheme()
                )));
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SAMPLE: &str = r#"
local = true
mocked_endpoints = ["fixtures/", "intents/"]

[backends.primary]
base_url = "http://localhost:5005/api/"
token = "secret"
request_timeout_ms = 2500
headers = { "X-Tenant" = "acme" }

[backends.auth]
base_url = "http://localhost:5006/auth/"
"#;

    #[test]
    fn test_parse_sample() {
        let config = ConsoleConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.local);
        assert_eq!(config.mocked_endpoints, vec!["fixtures/", "intents/"]);
        assert_eq!(config.backends.primary.token.as_deref(), Some("secret"));
        assert_eq!(
            config.backends.primary.request_timeout(),
            Some(Duration::from_millis(2500))
        );
        assert_eq!(config.backends.primary.headers["X-Tenant"], "acme");
        assert_eq!(config.backends.auth.base_url, "http://localhost:5006/auth/");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = ConsoleConfig::from_toml_str("").unwrap();
        assert_eq!(config, ConsoleConfig::default());
        assert!(!config.local);
        assert_eq!(config.backends.staged.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.backends.staged.request_timeout(), None);
        assert_eq!(
            config.backends.staged.connect_timeout(),
            Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS)
        );
    }

    #[test]
    fn test_rejects_relative_base_url() {
        let err = ConsoleConfig::from_toml_str("[backends.mocked]\nbase_url = \"mock/\"\n")
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Config(_)));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = ConsoleConfig::from_toml_str("[backends.auth]\nbase_url = \"ftp://host/\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = ConsoleConfig::load_from("/nonexistent/console.toml").unwrap_err();
        assert!(matches!(err, ConsoleError::Config(_)));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    #[serial]
    fn test_apply_env_overrides() {
        std::env::set_var(ENV_LOCAL, "yes");
        std::env::set_var(ENV_MOCKED_ENDPOINTS, "fixtures/, stories/ ,");

        let mut config = ConsoleConfig::default();
        config.apply_env();

        std::env::remove_var(ENV_LOCAL);
        std::env::remove_var(ENV_MOCKED_ENDPOINTS);

        assert!(config.local);
        assert_eq!(config.mocked_endpoints, vec!["fixtures/", "stories/"]);
    }

    #[test]
    #[serial]
    fn test_apply_env_ignores_bad_flag() {
        std::env::set_var(ENV_LOCAL, "sometimes");

        let mut config = ConsoleConfig {
            local: true,
            ..Default::default()
        };
        config.apply_env();

        std::env::remove_var(ENV_LOCAL);

        assert!(config.local);
    }
}
