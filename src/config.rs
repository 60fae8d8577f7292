//! Application-level configuration loading, including the discussion category set.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "AGORA_BACK_CONFIG_PATH";
/// Phase length applied when a structured debate is created without one.
const DEFAULT_PHASE_MINUTES: u32 = 5;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    categories: Vec<String>,
    default_phase_minutes: u32,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the baked-in category set.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        count = app_config.categories.len(),
                        "loaded discussion categories from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Category labels a discussion may be filed under.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Whether the candidate matches a configured category exactly.
    pub fn is_known_category(&self, candidate: &str) -> bool {
        self.categories
            .iter()
            .any(|category| category == candidate)
    }

    /// Phase length applied when a structured debate is created without one.
    pub fn default_phase_minutes(&self) -> u32 {
        self.default_phase_minutes
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            default_phase_minutes: DEFAULT_PHASE_MINUTES,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    categories: Vec<String>,
    #[serde(default)]
    default_phase_minutes: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            categories: value.categories,
            default_phase_minutes: value.default_phase_minutes.unwrap_or(DEFAULT_PHASE_MINUTES),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in category set shipped with the binary.
fn default_categories() -> Vec<String> {
    [
        "politics",
        "society",
        "economy",
        "technology",
        "culture",
        "environment",
        "education",
        "other",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}
