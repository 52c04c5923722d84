// Scripted provider for pipeline tests

use super::{ProviderError, SpeechProvider, SynthesisRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// What the provider does when it receives a given segment text
#[derive(Debug, Clone)]
pub enum Script {
    Audio(Vec<u8>),
    Rejected,
    Transient,
    /// Transient failures for the first `failures` calls, then audio
    FailThenAudio { failures: usize, audio: Vec<u8> },
    /// Audio returned after a delay
    Delayed(Duration, Vec<u8>),
    /// Never responds
    Hang,
    /// Occupy the path of part `part_name` under `output_dir` with a directory,
    /// so writing that part fails, then return audio
    BlockPart {
        output_dir: PathBuf,
        part_name: String,
        audio: Vec<u8>,
    },
    /// Delete the already written part `part_name` under `output_dir`, then
    /// return audio
    RemovePart {
        output_dir: PathBuf,
        part_name: String,
        audio: Vec<u8>,
    },
}

#[derive(Default)]
pub struct ScriptedProvider {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, script: Script) -> Self {
        self.scripts.insert(text.to_string(), script);
        self
    }

    /// Texts received, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, text: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|t| *t == text).count()
    }
}

/// Part directories of in-flight tracks under `output_dir`
fn part_dirs(output_dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(output_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(".parts-"))
        })
        .collect()
}

/// Recognizable audio payload: `len` copies of `tag`
pub fn audio(tag: u8, len: usize) -> Vec<u8> {
    vec![tag; len]
}

#[async_trait]
impl SpeechProvider for ScriptedProvider {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>, ProviderError> {
        let previous = {
            let mut calls = self.calls.lock().unwrap();
            let previous = calls.iter().filter(|t| *t == request.text).count();
            calls.push(request.text.to_string());
            previous
        };

        match self.scripts.get(request.text) {
            Some(Script::Audio(bytes)) => Ok(bytes.clone()),
            Some(Script::Rejected) => Err(ProviderError::Rejected(
                "InvalidSsmlException: unsupported SSML".to_string(),
            )),
            Some(Script::Transient) => Err(ProviderError::Transient(
                "ThrottlingException: rate exceeded".to_string(),
            )),
            Some(Script::FailThenAudio { failures, audio }) => {
                if previous < *failures {
                    Err(ProviderError::Transient("ServiceFailureException".to_string()))
                } else {
                    Ok(audio.clone())
                }
            }
            Some(Script::Delayed(delay, bytes)) => {
                tokio::time::sleep(*delay).await;
                Ok(bytes.clone())
            }
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::BlockPart {
                output_dir,
                part_name,
                audio,
            }) => {
                for dir in part_dirs(output_dir) {
                    fs::create_dir(dir.join(part_name)).unwrap();
                }
                Ok(audio.clone())
            }
            Some(Script::RemovePart {
                output_dir,
                part_name,
                audio,
            }) => {
                for dir in part_dirs(output_dir) {
                    fs::remove_file(dir.join(part_name)).unwrap();
                }
                Ok(audio.clone())
            }
            None => Err(ProviderError::Rejected(format!(
                "no script for {:?}",
                request.text
            ))),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
