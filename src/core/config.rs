use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::api::{Reasoning, ReasoningEffort, ReasoningSummary};

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {source}", path.display())
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chat: ChatConfig,
    pub relay: RelayConfig,
}

/// Settings for the interactive client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Relay endpoint the client talks to.
    pub base_url: String,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub reasoning_summary: Option<ReasoningSummary>,
    /// Debug log destination; defaults to the platform data directory.
    pub log_file: Option<PathBuf>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787".to_string(),
            reasoning_effort: None,
            reasoning_summary: None,
            log_file: None,
        }
    }
}

impl ChatConfig {
    /// Reasoning options for the request, present only when the user set
    /// either knob.
    pub fn reasoning(&self) -> Option<Reasoning> {
        if self.reasoning_effort.is_none() && self.reasoning_summary.is_none() {
            return None;
        }
        Some(Reasoning {
            effort: self.reasoning_effort.unwrap_or(ReasoningEffort::Medium),
            summary: self.reasoning_summary.unwrap_or(ReasoningSummary::Auto),
        })
    }
}

/// Settings for the relay proxy (`chinwag serve`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub listen_addr: String,
    /// Inference endpoint requests are forwarded to. Must be configured.
    pub upstream_url: String,
    /// Directory of static assets to serve alongside the API, if any.
    pub static_dir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8787".to_string(),
            upstream_url: String::new(),
            static_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn StdError>> {
        Self::load_from_path(&Self::config_path())
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, Box<dyn StdError>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
                path: config_path.to_path_buf(),
                source,
            })?;
            let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: config_path.to_path_buf(),
                source,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("io", "chinwag", "chinwag")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_loads_defaults() {
        let config = Config::load_from_path(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.chat.base_url, "http://127.0.0.1:8787");
        assert!(config.chat.reasoning().is_none());
        assert!(config.relay.upstream_url.is_empty());
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[chat]\nbase_url = \"https://relay.example.net\"\nreasoning_effort = \"high\"\n"
        )
        .unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.chat.base_url, "https://relay.example.net");
        let reasoning = config.chat.reasoning().unwrap();
        assert_eq!(reasoning.effort, ReasoningEffort::High);
        assert_eq!(reasoning.summary, ReasoningSummary::Auto);
        assert_eq!(config.relay.listen_addr, "127.0.0.1:8787");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chat = [not toml").unwrap();
        let err = Config::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
