//! Runtime configuration.
//!
//! Layers, lowest precedence first: built-in defaults, a JSON config file,
//! environment variables, command-line flags. Every file field is optional
//! and unknown fields are rejected.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "deepseek-coder:6.7b";
pub const DEFAULT_LM_COMMAND: &str = "ollama run {model}";

const CONFIG_DIR_NAME: &str = "versemark";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub ollama_url: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub default_model: String,
    pub timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub availability_ttl_secs: u64,
    /// Local fallback command; `{model}` is substituted. Empty disables it.
    pub lm_command: String,
    /// `num_predict` sent to the server; 0 leaves it to the server.
    pub max_output_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            username: None,
            password: None,
            default_model: DEFAULT_MODEL.to_string(),
            timeout_secs: 45,
            probe_timeout_secs: 5,
            availability_ttl_secs: 30,
            lm_command: DEFAULT_LM_COMMAND.to_string(),
            max_output_tokens: 4096,
        }
    }
}

/// Values given on the command line; `None` keeps the lower layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub ollama_url: Option<String>,
    pub model: Option<String>,
    pub lm_command: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn availability_ttl(&self) -> Duration {
        Duration::from_secs(self.availability_ttl_secs)
    }

    /// Apply environment variables read through `lookup`.
    ///
    /// Empty credentials count as unset. An empty `VERSEMARK_LM_COMMAND`
    /// disables the local fallback.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("OLLAMA_URL").filter(|url| !url.trim().is_empty()) {
            self.ollama_url = url;
        }
        if let Some(username) = lookup("OLLAMA_USERNAME") {
            self.username = (!username.is_empty()).then_some(username);
        }
        if let Some(password) = lookup("OLLAMA_PASSWORD") {
            self.password = (!password.is_empty()).then_some(password);
        }
        if let Some(model) = lookup("DEFAULT_MODEL").filter(|model| !model.trim().is_empty()) {
            self.default_model = model;
        }
        if let Some(command) = lookup("VERSEMARK_LM_COMMAND") {
            self.lm_command = command;
        }
        if let Some(raw) = lookup("VERSEMARK_TIMEOUT_SECS") {
            self.timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("parse VERSEMARK_TIMEOUT_SECS={raw:?}"))?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.ollama_url {
            self.ollama_url = url.clone();
        }
        if let Some(model) = &overrides.model {
            self.default_model = model.clone();
        }
        if let Some(command) = &overrides.lm_command {
            self.lm_command = command.clone();
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout_secs = secs;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.ollama_url.starts_with("http://") || self.ollama_url.starts_with("https://")) {
            return Err(anyhow!(
                "ollama_url must start with http:// or https:// (got {:?})",
                self.ollama_url
            ));
        }
        if self.default_model.trim().is_empty() {
            return Err(anyhow!("default_model must be non-empty"));
        }
        if self.timeout_secs == 0 || self.probe_timeout_secs == 0 {
            return Err(anyhow!("timeouts must be at least one second"));
        }
        if !self.lm_command.trim().is_empty() {
            shell_words::split(&self.lm_command)
                .with_context(|| format!("parse lm_command {:?}", self.lm_command))?;
        }
        Ok(())
    }
}

/// `<config dir>/versemark/config.json`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the file layer over the defaults.
///
/// An explicit `path` must exist. Without one, the default location is read
/// when present and the defaults are used otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => path,
            None => return Ok(Config::default()),
        },
    };
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config: Config = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Resolve every layer and validate the result.
pub fn resolve_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config> {
    let mut config = load_config(path)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    config.apply_overrides(overrides);
    config.validate()?;
    Ok(config)
}
