// narrate configuration management

use crate::assembler::EmptyOutputPolicy;
use crate::synthesizer::SynthesisOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_PROVIDER: &str = "polly";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_VOICE: &str = "Ruth";
const DEFAULT_OUTPUT_DIR: &str = "./driftlab-audio";
const DEFAULT_DELAY_MS: u64 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrateConfig {
    /// Speech provider to use
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Provider region
    #[serde(default = "default_region")]
    pub region: String,

    /// Voice for tracks that do not set their own
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Directory receiving the final audio files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Default catalog file (None requires --catalog)
    #[serde(default)]
    pub catalog: Option<PathBuf>,

    /// Minimum time between provider requests, in milliseconds
    #[serde(default = "default_delay_ms")]
    pub inter_request_delay_ms: u64,

    /// Upper bound on one provider request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries for transient failures (0 drops the segment on first failure)
    #[serde(default)]
    pub max_retries: u32,

    /// First retry delay in milliseconds, doubled per attempt
    #[serde(default = "default_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Segment requests in flight per track
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Behavior when every segment of a track fails
    #[serde(default)]
    pub empty_output: EmptyOutputPolicy,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_delay_ms() -> u64 {
    DEFAULT_DELAY_MS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}

fn default_concurrency() -> usize {
    1
}

impl Default for NarrateConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            region: default_region(),
            voice: default_voice(),
            output_dir: default_output_dir(),
            catalog: None,
            inter_request_delay_ms: default_delay_ms(),
            request_timeout_secs: default_timeout_secs(),
            max_retries: 0,
            initial_backoff_ms: default_backoff_ms(),
            concurrency: default_concurrency(),
            empty_output: EmptyOutputPolicy::default(),
        }
    }
}

impl NarrateConfig {
    /// Get the config file path: ~/.config/cli-programs/narrate.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("narrate.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Defaults when `path` does not exist
    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }

    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }

    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
        }
    }
}
