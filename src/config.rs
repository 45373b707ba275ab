//! Layered application configuration.
//!
//! Values are merged in this order, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file: `--config <PATH>` if given, else the platform config
//!    directory (`config.toml` under the `dupewise` project dirs)
//! 3. `DUPEWISE_*` environment variables (`__` separates nested keys)
//!
//! CLI flags are applied on top by the caller.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Wall-clock ceiling for one backend invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Keywords that mark a backend diagnostic line as progress worth showing.
pub const DEFAULT_PROGRESS_KEYWORDS: [&str; 4] = ["Processed", "Finding", "Done", "Calculating"];

#[cfg(windows)]
const DEFAULT_BACKEND: &str = "duplicate_finder.exe";
#[cfg(not(windows))]
const DEFAULT_BACKEND: &str = "duplicate_finder";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanner backend executable. Relative paths are looked up next to the
    /// running binary first, then in the working directory.
    pub backend: PathBuf,
    /// Per-invocation timeout in seconds.
    pub timeout_secs: u64,
    /// Diagnostic lines containing any of these are surfaced as status text.
    pub progress_keywords: Vec<String>,
    /// Colored terminal output.
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: PathBuf::from(DEFAULT_BACKEND),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            progress_keywords: DEFAULT_PROGRESS_KEYWORDS
                .iter()
                .map(ToString::to_string)
                .collect(),
            color: true,
        }
    }
}

impl Config {
    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// An explicit `path` must exist; the platform default file is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing or any layer fails
    /// to deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match path {
            Some(explicit) => {
                if !explicit.is_file() {
                    anyhow::bail!("Config file not found: {}", explicit.display());
                }
                figment = figment.merge(Toml::file(explicit));
            }
            None => {
                if let Some(default_path) = Self::default_path().filter(|p| p.is_file()) {
                    log::debug!("Using config file {}", default_path.display());
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        figment = figment.merge(Env::prefixed("DUPEWISE_").split("__"));

        figment
            .extract()
            .context("Failed to load dupewise configuration")
    }

    /// Platform-specific location of the optional config file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupewise", "dupewise")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Backend timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the backend path to the location that will be executed.
    ///
    /// Absolute paths are returned unchanged. A relative path is preferred
    /// next to the running executable when a file exists there.
    #[must_use]
    pub fn resolve_backend(&self) -> PathBuf {
        if self.backend.is_absolute() {
            return self.backend.clone();
        }

        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(&self.backend)));

        match beside_exe {
            Some(candidate) if candidate.is_file() => candidate,
            _ => self.backend.clone(),
        }
    }
}
