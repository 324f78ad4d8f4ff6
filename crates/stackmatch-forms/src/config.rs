//! Engine configuration and its resolution order.
//!
//! A config file is looked up in this order:
//! 1. an explicit path (the CLI `--config` flag)
//! 2. the `STACKMATCH_FORMS_CONFIG` environment variable
//! 3. `<config dir>/stackmatch/forms.toml`
//! 4. built-in defaults

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use rfq_form_spec::{CompletionPolicy, FormPolicy, NavigationPolicy, RequiredPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const CONFIG_ENV: &str = "STACKMATCH_FORMS_CONFIG";
const CONFIG_DIR: &str = "stackmatch";
const CONFIG_FILE: &str = "forms.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What happens to the answer store after a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitCleanup {
    /// Empty the store and discard the saved draft.
    #[default]
    Clear,
    /// Keep the answers readable on the closed session.
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub navigation: NavigationPolicy,
    pub default_required: bool,
    pub require_complete_submission: bool,
    /// `0` disables autosave.
    pub autosave_interval_secs: u64,
    pub submission_timeout_secs: u64,
    pub submit_cleanup: SubmitCleanup,
    pub draft_dir: Option<PathBuf>,
    pub submission_base_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            navigation: NavigationPolicy::Strict,
            default_required: true,
            require_complete_submission: true,
            autosave_interval_secs: 5,
            submission_timeout_secs: 15,
            submit_cleanup: SubmitCleanup::Clear,
            draft_dir: None,
            submission_base_url: None,
        }
    }
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Flag(PathBuf),
    Env(PathBuf),
    UserConfig(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Flag(path) => write!(f, "--config {}", path.display()),
            ConfigSource::Env(path) => write!(f, "{CONFIG_ENV}={}", path.display()),
            ConfigSource::UserConfig(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw, path)
    }

    /// Resolves the configuration from the flag, the environment, the user
    /// config directory, then defaults.
    pub fn resolve(flag: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let env = std::env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self::resolve_from(flag, env, default_config_path())
    }

    /// Same as [`EngineConfig::resolve`] with the environment and the user
    /// config path supplied by the caller.
    pub fn resolve_from(
        flag: Option<&Path>,
        env: Option<PathBuf>,
        user_config: Option<PathBuf>,
    ) -> Result<(Self, ConfigSource), ConfigError> {
        let (config, source) = if let Some(path) = flag {
            (Self::load(path)?, ConfigSource::Flag(path.to_path_buf()))
        } else if let Some(path) = env {
            (Self::load(&path)?, ConfigSource::Env(path))
        } else if let Some(path) = user_config.filter(|path| path.is_file()) {
            (Self::load(&path)?, ConfigSource::UserConfig(path))
        } else {
            (Self::default(), ConfigSource::Defaults)
        };
        debug!(%source, "engine config resolved");
        Ok((config, source))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.submission_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "submission_timeout_secs must be greater than zero".into(),
            ));
        }
        if let Some(base) = &self.submission_base_url {
            let valid = Url::parse(base).is_ok_and(|url| {
                matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
            });
            if !valid {
                return Err(ConfigError::Invalid(format!(
                    "submission_base_url must be an http(s) url, got '{base}'"
                )));
            }
        }
        Ok(())
    }

    pub fn form_policy(&self) -> FormPolicy {
        FormPolicy {
            required: RequiredPolicy {
                default_required: self.default_required,
            },
            navigation: self.navigation,
            completion: CompletionPolicy {
                require_complete: self.require_complete_submission,
            },
        }
    }

    pub fn autosave_interval(&self) -> Option<Duration> {
        (self.autosave_interval_secs > 0).then(|| Duration::from_secs(self.autosave_interval_secs))
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }

    /// Configured draft directory, or `<local data dir>/stackmatch/drafts`.
    pub fn draft_dir(&self) -> Option<PathBuf> {
        self.draft_dir.clone().or_else(|| {
            BaseDirs::new().map(|dirs| dirs.data_local_dir().join(CONFIG_DIR).join("drafts"))
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join(CONFIG_DIR).join(CONFIG_FILE))
}
