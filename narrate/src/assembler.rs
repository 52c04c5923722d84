// Per-track pipeline: synthesize segments to part files, then concatenate in order

use crate::catalog::Track;
use crate::synthesizer::{SynthesisError, Synthesizer};
use futures_util::{StreamExt, TryStreamExt, stream};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// What to do when no segment of a track could be synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyOutputPolicy {
    /// Write a zero-byte output file
    #[default]
    WriteEmpty,
    /// Fail the track and leave any previous output untouched
    FailTrack,
}

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("failed to create part directory in {dir}: {source}")]
    PartDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Part(SynthesisError),

    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("every segment of '{slug}' failed; no output written")]
    NothingSynthesized { slug: String },

    #[error("concatenation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Outcome of one assembled track
#[derive(Debug, Clone)]
pub struct TrackReport {
    pub slug: String,
    pub output: PathBuf,
    /// Final output size
    pub bytes: u64,
    pub segments: usize,
    /// 1-based indexes of segments missing from the output
    pub failed: Vec<usize>,
}

impl TrackReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Assembler {
    synthesizer: Synthesizer,
    output_dir: PathBuf,
    voice: String,
    concurrency: usize,
    empty_output: EmptyOutputPolicy,
    progress: ProgressBar,
}

impl Assembler {
    /// `voice` applies to tracks that do not name their own
    pub fn new(synthesizer: Synthesizer, output_dir: PathBuf, voice: String) -> Self {
        Self {
            synthesizer,
            output_dir,
            voice,
            concurrency: 1,
            empty_output: EmptyOutputPolicy::default(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Maximum segment requests in flight for one track
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_empty_output(mut self, policy: EmptyOutputPolicy) -> Self {
        self.empty_output = policy;
        self
    }

    /// Progress bar advanced once per finished segment
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn output_path(&self, track: &Track) -> PathBuf {
        self.output_dir.join(track.output_file_name())
    }

    /// Run one track through synthesis and concatenation
    pub async fn assemble(&self, track: &Track) -> Result<TrackReport, AssembleError> {
        // Unique per run, so concurrent runs never share part names
        let parts_dir = tempfile::Builder::new()
            .prefix(".parts-")
            .tempdir_in(&self.output_dir)
            .map_err(|source| AssembleError::PartDir {
                dir: self.output_dir.clone(),
                source,
            })?;

        let requests = track.requests(&self.voice);
        let parts: Vec<Option<PathBuf>> = stream::iter(requests.iter().enumerate())
            .map(|(i, request)| {
                let part_path = parts_dir.path().join(track.part_file_name(i + 1));
                async move {
                    let outcome = match self.synthesizer.synthesize_to(request, &part_path).await {
                        Ok(part) => {
                            log::debug!("    stored {} bytes at {}", part.bytes, part.path.display());
                            Ok(Some(part.path))
                        }
                        Err(e) if e.is_fatal() => Err(AssembleError::Part(e)),
                        Err(e) => {
                            log::warn!("    ERROR {}", e);
                            Ok(None)
                        }
                    };
                    self.progress.inc(1);
                    outcome
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut failed: Vec<usize> = parts
            .iter()
            .enumerate()
            .filter(|(_, part)| part.is_none())
            .map(|(i, _)| i + 1)
            .collect();

        if failed.len() == parts.len() && self.empty_output == EmptyOutputPolicy::FailTrack {
            return Err(AssembleError::NothingSynthesized {
                slug: track.slug.clone(),
            });
        }

        let output = self.output_path(track);
        let concatenated = {
            let output = output.clone();
            tokio::task::spawn_blocking(move || concatenate(&parts, &output)).await?
        }
        .map_err(|source| AssembleError::Output {
            path: output.clone(),
            source,
        })?;

        if !concatenated.skipped.is_empty() {
            log::warn!(
                "    parts {:?} of {} vanished before concatenation",
                concatenated.skipped,
                track.slug
            );
            failed.extend(&concatenated.skipped);
            failed.sort_unstable();
            failed.dedup();
        }

        log::info!(
            "  >> {} ({:.1} MB)",
            track.output_file_name(),
            concatenated.bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(TrackReport {
            slug: track.slug.clone(),
            output,
            bytes: concatenated.bytes,
            segments: requests.len(),
            failed,
        })
    }
}

/// Result of [`concatenate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concatenated {
    /// Final output size
    pub bytes: u64,
    /// 1-based indexes of parts that were expected but missing from disk
    pub skipped: Vec<usize>,
}

/// Append every present part to `output`, in order, deleting each part once read.
///
/// Absent entries and parts missing from disk are skipped without leaving a
/// gap; the latter are reported in [`Concatenated::skipped`]. The output is
/// staged next to its destination and renamed into place, so it is always
/// created (possibly empty) and always replaces, never appends to, a previous
/// file. A part that cannot be deleted after reading is logged and left behind.
pub fn concatenate(parts: &[Option<PathBuf>], output: &Path) -> io::Result<Concatenated> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut skipped = Vec::new();
    let mut staged = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        for (i, part) in parts.iter().enumerate() {
            let Some(part) = part else { continue };
            let mut reader = match File::open(part) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!("Part vanished before concatenation: {}", part.display());
                    skipped.push(i + 1);
                    continue;
                }
                Err(e) => return Err(e),
            };
            io::copy(&mut reader, &mut writer)?;
            drop(reader);
            if let Err(e) = fs::remove_file(part) {
                log::warn!("Failed to remove part {}: {}", part.display(), e);
            }
        }
        writer.flush()?;
    }

    let file = staged.persist(output).map_err(|e| e.error)?;
    Ok(Concatenated {
        bytes: file.metadata()?.len(),
        skipped,
    })
}
