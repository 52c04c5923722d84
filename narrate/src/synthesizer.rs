// Single-segment synthesis: pacing, timeout, retry, part file persistence

use crate::pacer::RequestPacer;
use crate::tts::{ProviderError, SpeechProvider, SynthesisRequest};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Per-request limits applied by the synthesizer
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Upper bound on one provider call
    pub timeout: Duration,
    /// Extra attempts for transient failures (0 = fail on first error)
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further attempt
    pub initial_backoff: Duration,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 0,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
        }
    }
}

/// Why a segment produced no part file
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("{part}: {source}")]
    Provider {
        part: String,
        #[source]
        source: ProviderError,
    },

    #[error("{part}: no response within {timeout:?}")]
    Timeout { part: String, timeout: Duration },

    #[error("{part}: failed to write part file: {source}")]
    Io {
        part: String,
        #[source]
        source: std::io::Error,
    },
}

impl SynthesisError {
    /// Filesystem failures end the track; everything else only loses the segment
    pub fn is_fatal(&self) -> bool {
        matches!(self, SynthesisError::Io { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            SynthesisError::Provider { source, .. } => source.is_retryable(),
            SynthesisError::Timeout { .. } => true,
            SynthesisError::Io { .. } => false,
        }
    }
}

/// A persisted segment
#[derive(Debug, Clone)]
pub struct PartFile {
    pub path: PathBuf,
    pub bytes: u64,
}

pub struct Synthesizer {
    provider: Arc<dyn SpeechProvider>,
    pacer: Arc<RequestPacer>,
    options: SynthesisOptions,
}

impl Synthesizer {
    pub fn new(
        provider: Arc<dyn SpeechProvider>,
        pacer: Arc<RequestPacer>,
        options: SynthesisOptions,
    ) -> Self {
        Self {
            provider,
            pacer,
            options,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch the full audio stream for one segment.
    ///
    /// `part` names the segment in errors and log lines.
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
        part: &str,
    ) -> Result<Vec<u8>, SynthesisError> {
        let mut attempt = 0;
        loop {
            self.pacer.acquire().await;

            let err = match tokio::time::timeout(
                self.options.timeout,
                self.provider.synthesize(request),
            )
            .await
            {
                Ok(Ok(audio)) => return Ok(audio),
                Ok(Err(source)) => SynthesisError::Provider {
                    part: part.to_string(),
                    source,
                },
                Err(_) => SynthesisError::Timeout {
                    part: part.to_string(),
                    timeout: self.options.timeout,
                },
            };

            if !err.is_retryable() || attempt >= self.options.max_retries {
                return Err(err);
            }

            let backoff = backoff_delay(self.options.initial_backoff, attempt);
            log::warn!(
                "    {} (attempt {}/{}), retrying in {:?}",
                err,
                attempt + 1,
                self.options.max_retries.saturating_add(1),
                backoff
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Synthesize one segment and write it to `part_path`
    pub async fn synthesize_to(
        &self,
        request: &SynthesisRequest<'_>,
        part_path: &Path,
    ) -> Result<PartFile, SynthesisError> {
        let part = part_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| part_path.display().to_string());

        let audio = self.synthesize(request, &part).await?;

        tokio::fs::write(part_path, &audio)
            .await
            .map_err(|source| SynthesisError::Io {
                part: part.clone(),
                source,
            })?;

        log::info!("    {} ({:.0} KB)", part, audio.len() as f64 / 1024.0);

        Ok(PartFile {
            path: part_path.to_path_buf(),
            bytes: audio.len() as u64,
        })
    }
}

/// `initial * 2^attempt`, capped at `MAX_BACKOFF`
fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    initial.saturating_mul(factor).min(MAX_BACKOFF)
}
