//! Configuration loading for flagcache.
//!
//! Settings are layered, later layers overriding earlier ones:
//! 1. Built-in defaults.
//! 2. A config file (TOML, YAML or JSON, picked by extension). Either the
//!    path given on the command line, or `config.toml` in the platform's
//!    config directory if it exists.
//! 3. Environment variables prefixed with `FLAGCACHE_`, for example
//!    `FLAGCACHE_EVAL_ONLY_MODE=true`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use flagcache_source::SourceSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "FLAGCACHE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serve from a JSON envelope instead of the flag database.
    pub eval_only_mode: bool,
    /// SQL dialect (`sqlite3`, `mysql`, `postgres`) or, in evaluation-only
    /// mode, the envelope transport (`json_file`, `json_http`, `json_s3`).
    pub db_driver: String,
    /// Database URL, file path, HTTP URL or object location, depending on
    /// the driver.
    pub db_connection_str: String,
    pub eval_cache_refresh_timeout_secs: u64,
    pub eval_cache_refresh_interval_secs: u64,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            eval_only_mode: false,
            db_driver: "sqlite3".to_string(),
            db_connection_str: "sqlite://flagcache.sqlite".to_string(),
            eval_cache_refresh_timeout_secs: 59,
            eval_cache_refresh_interval_secs: 3,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used only if a file is actually there.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                figment = merge_file(figment, path)?;
            },
            None => {
                if let Some(path) = Self::default_path()
                    && path.is_file()
                {
                    figment = merge_file(figment, &path)?;
                }
            },
        }
        let config: Self = figment.merge(Env::prefixed(ENV_PREFIX)).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(
            eval_only_mode = config.eval_only_mode,
            driver = %config.db_driver,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// `config.toml` inside the platform config directory, e.g.
    /// `~/.config/flagcache/config.toml` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "flagcache").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.eval_cache_refresh_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.eval_cache_refresh_interval_secs)
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            eval_only_mode: self.eval_only_mode,
            driver: self.db_driver.clone(),
            connection: self.db_connection_str.clone(),
            timeout: self.refresh_timeout(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.eval_cache_refresh_interval_secs == 0 {
            exn::bail!(ErrorKind::Invalid("eval_cache_refresh_interval_secs must be at least 1"));
        }
        if self.eval_cache_refresh_timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("eval_cache_refresh_timeout_secs must be at least 1"));
        }
        if self.db_connection_str.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("db_connection_str must not be empty"));
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    let figment = match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    };
    tracing::debug!(path = %path.display(), "Merged config file");
    Ok(figment)
}
