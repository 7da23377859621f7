//! Configuration for the Papra connection and the optional OpenRouter
//! auto-tagging feature.
//!
//! All settings live in one [`IngestConfig`], persisted as JSON in the user's
//! config directory and editable through the `--setup` wizard. The Papra
//! fields are required for any upload; the OpenRouter API key is optional
//! and merely gates the autotag feature.
//!
//! # Builder over constructor
//! Library callers (and tests) usually care about two or three fields.
//! [`IngestConfigBuilder`] lets them set only those and rely on the defaults
//! for the rest, with validation deferred to [`IngestConfigBuilder::build`].

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default OpenRouter API endpoint.
pub const DEFAULT_OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";

/// Default model used for tag inference.
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-5-nano";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "PAPRA_INGEST_CONFIG";

/// Persisted settings for the ingest tool.
///
/// Field names match the on-disk JSON keys.
///
/// # Example
/// ```rust
/// use papra_ingest::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .papra_url("papra.example.com/")
///     .papra_api_key("pk_live")
///     .papra_organization_id("org_1")
///     .build()
///     .unwrap();
/// assert_eq!(config.papra_url, "https://papra.example.com");
/// assert!(!config.is_autotag_available());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Base URL of the Papra instance, normalised to `https://host[:port]`.
    pub papra_url: String,

    /// Papra API key sent as a bearer token.
    pub papra_api_key: String,

    /// Organisation that owns uploaded documents and tags.
    pub papra_organization_id: String,

    /// OpenRouter-compatible base URL. Only its origin is used; requests go
    /// to `/api/v1/chat/completions` on that host.
    pub openrouter_endpoint: String,

    /// OpenRouter API key. `None` disables autotag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openrouter_api_key: Option<String>,

    /// Model identifier passed verbatim in the chat-completion request.
    pub openrouter_model_name: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            papra_url: String::new(),
            papra_api_key: String::new(),
            papra_organization_id: String::new(),
            openrouter_endpoint: DEFAULT_OPENROUTER_ENDPOINT.to_string(),
            openrouter_api_key: None,
            openrouter_model_name: DEFAULT_OPENROUTER_MODEL.to_string(),
        }
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("papra_url", &self.papra_url)
            .field("papra_api_key", &redact(&self.papra_api_key))
            .field("papra_organization_id", &self.papra_organization_id)
            .field("openrouter_endpoint", &self.openrouter_endpoint)
            .field(
                "openrouter_api_key",
                &self.openrouter_api_key.as_deref().map(redact),
            )
            .field("openrouter_model_name", &self.openrouter_model_name)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether the autotag feature can run (an OpenRouter key is present).
    pub fn is_autotag_available(&self) -> bool {
        self.openrouter_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// Check the fields every upload needs.
    pub fn validate(&self) -> Result<(), IngestError> {
        let required = [
            ("papra_url", &self.papra_url),
            ("papra_api_key", &self.papra_api_key),
            ("papra_organization_id", &self.papra_organization_id),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::InvalidConfig(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Where the configuration file lives.
    ///
    /// `$PAPRA_INGEST_CONFIG` wins, then `papra-ingest/config.json` under the
    /// platform config directory (`$XDG_CONFIG_HOME` or `~/.config` on Linux,
    /// `~/Library/Application Support` on macOS, `%APPDATA%` on Windows).
    pub fn default_path() -> PathBuf {
        config_path_from(non_empty_env(CONFIG_PATH_ENV))
    }

    /// Load the configuration from `path`.
    ///
    /// A missing file yields `Ok(None)` so the caller can start the setup
    /// wizard; an unreadable or malformed file is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, IngestError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration at {}", path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(IngestError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut config: Self =
            serde_json::from_str(&raw).map_err(|source| IngestError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.papra_url = normalize_url(&config.papra_url);
        if config.openrouter_endpoint.trim().is_empty() {
            config.openrouter_endpoint = DEFAULT_OPENROUTER_ENDPOINT.to_string();
        }
        if config.openrouter_model_name.trim().is_empty() {
            config.openrouter_model_name = DEFAULT_OPENROUTER_MODEL.to_string();
        }
        debug!("Loaded configuration from {}", path.display());
        Ok(Some(config))
    }

    /// Write the configuration to `path` as pretty JSON, creating parent
    /// directories. The write goes through a temp file and a rename.
    pub fn save(&self, path: &Path) -> Result<(), IngestError> {
        let write_err = |source| IngestError::ConfigWrite {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| IngestError::Internal(format!("serialise config: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, path).map_err(write_err)?;
        Ok(())
    }
}

fn config_path_from(override_path: Option<String>) -> PathBuf {
    if let Some(p) = override_path {
        return PathBuf::from(p);
    }
    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(std::env::temp_dir);
    base.join("papra-ingest").join("config.json")
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Add `https://` when no scheme is given and strip trailing slashes.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    with_scheme.trim_end_matches('/').to_string()
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn papra_url(mut self, url: impl AsRef<str>) -> Self {
        self.config.papra_url = normalize_url(url.as_ref());
        self
    }

    pub fn papra_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.papra_api_key = key.into();
        self
    }

    pub fn papra_organization_id(mut self, id: impl Into<String>) -> Self {
        self.config.papra_organization_id = id.into();
        self
    }

    pub fn openrouter_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.openrouter_endpoint = endpoint.into();
        self
    }

    pub fn openrouter_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openrouter_api_key = Some(key.into());
        self
    }

    pub fn openrouter_model_name(mut self, model: impl Into<String>) -> Self {
        self.config.openrouter_model_name = model.into();
        self
    }

    /// Build the configuration, validating required fields.
    pub fn build(self) -> Result<IngestConfig, IngestError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
