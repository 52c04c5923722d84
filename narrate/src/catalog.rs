// Track catalog: declarative list of narration tracks loaded from TOML

use crate::tts::{AudioFormat, Engine, SynthesisRequest};
use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Story,
    Meditation,
    Breathing,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackKind::Story => "story",
            TrackKind::Meditation => "meditation",
            TrackKind::Breathing => "breathing",
        };
        f.write_str(name)
    }
}

/// One output file and the ordered SSML segments that make it up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Display name (e.g., "Box Breathing")
    pub name: String,

    /// Output file stem (e.g., "breath-02-box")
    pub slug: String,

    #[serde(default)]
    pub kind: Option<TrackKind>,

    /// Voice override; the configured voice is used when absent
    #[serde(default)]
    pub voice: Option<String>,

    #[serde(default)]
    pub engine: Engine,

    #[serde(default)]
    pub format: AudioFormat,

    /// SSML segments in playback order
    pub segments: Vec<String>,
}

impl Track {
    /// Final output file name: `<slug>.<ext>`
    pub fn output_file_name(&self) -> String {
        format!("{}.{}", self.slug, self.format.extension())
    }

    /// Part file name for the 1-based segment `index`
    pub fn part_file_name(&self, index: usize) -> String {
        format!("_{}_p{}.{}", self.slug, index, self.format.extension())
    }

    pub fn voice<'a>(&'a self, default_voice: &'a str) -> &'a str {
        self.voice.as_deref().unwrap_or(default_voice)
    }

    /// Provider requests for every segment, in order
    pub fn requests<'a>(&'a self, default_voice: &'a str) -> Vec<SynthesisRequest<'a>> {
        let voice = self.voice(default_voice);
        self.segments
            .iter()
            .map(|text| SynthesisRequest {
                text,
                voice,
                engine: self.engine,
                format: self.format,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Catalog {
    /// Load and validate a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid catalog: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        if self.tracks.is_empty() {
            bail!("Catalog contains no tracks");
        }

        let mut seen = HashSet::new();
        for track in &self.tracks {
            validate_slug(&track.slug)?;
            if !seen.insert(track.slug.as_str()) {
                bail!("Duplicate track slug: {}", track.slug);
            }
            if track.segments.is_empty() {
                bail!("Track '{}' has no segments", track.slug);
            }
            if let Some(voice) = &track.voice {
                if voice.trim().is_empty() {
                    bail!("Track '{}' has an empty voice", track.slug);
                }
            }
        }

        Ok(())
    }

    /// Tracks to run, in catalog order.
    ///
    /// An empty `only` selects every track. Unknown slugs are an error.
    pub fn select(&self, only: &[String], kind: Option<TrackKind>) -> Result<Vec<&Track>> {
        for slug in only {
            if !self.tracks.iter().any(|t| &t.slug == slug) {
                bail!("Unknown track slug: {}", slug);
            }
        }

        Ok(self
            .tracks
            .iter()
            .filter(|t| only.is_empty() || only.contains(&t.slug))
            .filter(|t| kind.is_none() || t.kind == kind)
            .collect())
    }

    pub fn segment_count(tracks: &[&Track]) -> usize {
        tracks.iter().map(|t| t.segments.len()).sum()
    }
}

/// Slugs become file names inside the output directory
fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() {
        bail!("Track slug must not be empty");
    }
    if slug.starts_with('.') {
        bail!("Track slug must not start with '.': {}", slug);
    }
    if let Some(c) = slug
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        bail!("Track slug contains invalid character {:?}: {}", c, slug);
    }
    Ok(())
}
