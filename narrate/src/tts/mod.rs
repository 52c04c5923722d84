// Speech provider trait and request types

pub mod polly;
#[cfg(test)]
pub mod testing;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Provider quality tier used for a synthesis request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    Standard,
    Neural,
    #[default]
    LongForm,
    Generative,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Standard => "standard",
            Engine::Neural => "neural",
            Engine::LongForm => "long-form",
            Engine::Generative => "generative",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding of the returned audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioFormat {
    #[default]
    Mp3,
    OggVorbis,
    Pcm,
}

impl AudioFormat {
    /// File extension for parts and final outputs
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::OggVorbis => "ogg",
            AudioFormat::Pcm => "pcm",
        }
    }
}

/// One marked-up segment ready to be sent to a provider
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    /// SSML text, passed through unvalidated
    pub text: &'a str,
    /// Provider voice identifier (e.g., "Ruth")
    pub voice: &'a str,
    pub engine: Engine,
    pub format: AudioFormat,
}

/// Failure reported by a provider for a single request
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider refused the input (bad markup, unsupported voice/engine)
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Network failure, throttling, or a provider-side fault
    #[error("provider unavailable: {0}")]
    Transient(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// Speech provider trait - all synthesis services implement this
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize one segment, returning the complete audio stream
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>, ProviderError>;

    /// Provider name
    fn name(&self) -> &str;
}

/// Create a speech provider by name
pub async fn create_provider(name: &str, region: &str) -> Result<Arc<dyn SpeechProvider>> {
    match name {
        "polly" => Ok(Arc::new(polly::PollyProvider::from_env(region).await)),
        _ => anyhow::bail!("Unknown speech provider: {}. Available: polly", name),
    }
}
