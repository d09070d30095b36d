// Nightshift — Resumable day/night batch driver for a local image-generation queue
// License: Apache-2.0

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("home directory not found")]
    NoHomeDir,
    #[error("invalid service url {url:?}: {reason}")]
    InvalidServiceUrl { url: String, reason: String },
    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub nodes: NodeLabels,
    #[serde(default)]
    pub text: TextConfig,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_url")]
    pub url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,
    #[serde(default = "default_status_timeout_secs")]
    pub status_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: default_service_url(),
            poll_interval_ms: default_poll_interval_ms(),
            health_timeout_secs: default_health_timeout_secs(),
            submit_timeout_secs: default_submit_timeout_secs(),
            status_timeout_secs: default_status_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_service_url() -> String {
    "http://127.0.0.1:8188".to_string()
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_health_timeout_secs() -> u64 {
    10
}
fn default_submit_timeout_secs() -> u64 {
    60
}
fn default_status_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_workflow_path")]
    pub workflow: PathBuf,
    #[serde(default = "default_prompts_path")]
    pub prompts: PathBuf,
    #[serde(default = "default_progress_path")]
    pub progress: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            workflow: default_workflow_path(),
            prompts: default_prompts_path(),
            progress: default_progress_path(),
        }
    }
}

fn default_workflow_path() -> PathBuf {
    PathBuf::from("/workspace/jobs/day_night_workflow_api.json")
}
fn default_prompts_path() -> PathBuf {
    PathBuf::from("/workspace/jobs/prompts.txt")
}
fn default_progress_path() -> PathBuf {
    PathBuf::from("/workspace/jobs/progress.json")
}

// ---------------------------------------------------------------------------
// Workflow node labels
// ---------------------------------------------------------------------------

/// Titles and type tags used to locate the nodes a batch run rewrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLabels {
    #[serde(default = "default_day_title")]
    pub day_title: String,
    #[serde(default = "default_night_title")]
    pub night_title: String,
    #[serde(default = "default_negative_title")]
    pub negative_title: String,
    #[serde(default = "default_sampler_class")]
    pub sampler_class: String,
}

impl Default for NodeLabels {
    fn default() -> Self {
        Self {
            day_title: default_day_title(),
            night_title: default_night_title(),
            negative_title: default_negative_title(),
            sampler_class: default_sampler_class(),
        }
    }
}

fn default_day_title() -> String {
    "PROMPT_DAY".to_string()
}
fn default_night_title() -> String {
    "PROMPT_NIGHT".to_string()
}
fn default_negative_title() -> String {
    "NEGATIVE".to_string()
}
fn default_sampler_class() -> String {
    "KSampler".to_string()
}

// ---------------------------------------------------------------------------
// Prompt text
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_day_suffix")]
    pub day_suffix: String,
    #[serde(default = "default_night_suffix")]
    pub night_suffix: String,
    #[serde(default = "default_negative")]
    pub negative: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            day_suffix: default_day_suffix(),
            night_suffix: default_night_suffix(),
            negative: default_negative(),
        }
    }
}

fn default_prefix() -> String {
    "photo-realistic street-level photograph".to_string()
}
fn default_day_suffix() -> String {
    "daytime, natural sunlight, clear visibility, realistic lighting, \
     street-level photograph, photo-realistic, DSLR"
        .to_string()
}
fn default_night_suffix() -> String {
    "nighttime, street lights, headlights illumination, realistic night lighting, \
     street-level photograph, photo-realistic, DSLR"
        .to_string()
}
fn default_negative() -> String {
    "cartoon, illustration, CGI, blurry, low resolution, distorted vehicles, \
     warped road markings, unreadable text, gibberish letters, unreal lighting"
        .to_string()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a JSON file, falling back to defaults.
    ///
    /// Environment overrides are applied in both cases.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (prefix: NIGHTSHIFT_)
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("NIGHTSHIFT_SERVICE_URL") {
            self.service.url = v;
        }
        if let Ok(v) = std::env::var("NIGHTSHIFT_POLL_INTERVAL_MS") {
            if let Ok(n) = v.parse() {
                self.service.poll_interval_ms = n;
            }
        }
        if let Ok(v) = std::env::var("NIGHTSHIFT_WORKFLOW_PATH") {
            self.paths.workflow = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NIGHTSHIFT_PROMPTS_PATH") {
            self.paths.prompts = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NIGHTSHIFT_PROGRESS_PATH") {
            self.paths.progress = PathBuf::from(v);
        }
    }

    /// Get the default config file path: ~/.nightshift/config.json
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".nightshift").join("config.json"))
    }

    /// Service base URL without a trailing slash.
    pub fn service_base(&self) -> &str {
        self.service.url.trim_end_matches('/')
    }

    /// Validate that the configuration can drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.service.url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            Ok(u) => {
                return Err(ConfigError::InvalidServiceUrl {
                    url: self.service.url.clone(),
                    reason: format!("unsupported scheme {:?}", u.scheme()),
                })
            }
            Err(e) => {
                return Err(ConfigError::InvalidServiceUrl {
                    url: self.service.url.clone(),
                    reason: e.to_string(),
                })
            }
        }

        if self.service.poll_interval_ms == 0 {
            return Err(ConfigError::Other(
                "service.poll_interval_ms must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
