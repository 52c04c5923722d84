// Catalog driver: runs selected tracks one after another

use crate::assembler::{Assembler, TrackReport};
use crate::catalog::Track;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;

/// Exit status when some segments are missing from otherwise written tracks
const EXIT_PARTIAL: u8 = 2;

#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: Vec<TrackReport>,
    /// (slug, error) for tracks that produced no output
    pub failed: Vec<(String, String)>,
}

impl RunSummary {
    pub fn missing_segments(&self) -> usize {
        self.completed.iter().map(|r| r.failed.len()).sum()
    }

    pub fn exit_code(&self) -> ExitCode {
        if !self.failed.is_empty() {
            ExitCode::FAILURE
        } else if self.missing_segments() > 0 {
            ExitCode::from(EXIT_PARTIAL)
        } else {
            ExitCode::SUCCESS
        }
    }
}

/// Create the output directory if needed
pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

/// Assemble each track in order. A failed track is reported and skipped.
pub async fn run_tracks(assembler: &Assembler, tracks: &[&Track]) -> RunSummary {
    let mut summary = RunSummary::default();

    for track in tracks {
        log::info!("{}...", track.name);
        match assembler.assemble(track).await {
            Ok(report) => {
                if !report.is_complete() {
                    log::warn!(
                        "  {}: {} of {} segments missing",
                        report.slug,
                        report.failed.len(),
                        report.segments
                    );
                }
                summary.completed.push(report);
            }
            Err(e) => {
                log::error!("  FAILED {}: {}", track.slug, e);
                summary.failed.push((track.slug.clone(), e.to_string()));
            }
        }
    }

    summary
}
