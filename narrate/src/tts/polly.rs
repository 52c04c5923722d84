// Amazon Polly speech provider

use super::{AudioFormat, Engine, ProviderError, SpeechProvider, SynthesisRequest};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_polly::Client;
use aws_sdk_polly::config::Region;
use aws_sdk_polly::error::{DisplayErrorContext, SdkError};
use aws_sdk_polly::operation::synthesize_speech::SynthesizeSpeechError;
use aws_sdk_polly::types::{self, OutputFormat, TextType, VoiceId};
use std::fmt::Debug;

/// Polly provider using the ambient AWS credential chain
pub struct PollyProvider {
    client: Client,
}

impl PollyProvider {
    /// Build a client from the environment, pinned to `region`
    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&config),
        }
    }

    fn engine(engine: Engine) -> types::Engine {
        match engine {
            Engine::Standard => types::Engine::Standard,
            Engine::Neural => types::Engine::Neural,
            Engine::LongForm => types::Engine::LongForm,
            Engine::Generative => types::Engine::Generative,
        }
    }

    fn output_format(format: AudioFormat) -> OutputFormat {
        match format {
            AudioFormat::Mp3 => OutputFormat::Mp3,
            AudioFormat::OggVorbis => OutputFormat::OggVorbis,
            AudioFormat::Pcm => OutputFormat::Pcm,
        }
    }
}

/// Input the service refuses outright; resending it cannot succeed
fn is_rejection(err: &SynthesizeSpeechError) -> bool {
    matches!(
        err,
        SynthesizeSpeechError::InvalidSsmlException(_)
            | SynthesizeSpeechError::EngineNotSupportedException(_)
            | SynthesizeSpeechError::LanguageNotSupportedException(_)
            | SynthesizeSpeechError::TextLengthExceededException(_)
            | SynthesizeSpeechError::LexiconNotFoundException(_)
            | SynthesizeSpeechError::InvalidSampleRateException(_)
    )
}

fn classify<R: Debug>(err: SdkError<SynthesizeSpeechError, R>) -> ProviderError {
    let detail = DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        Some(service) if is_rejection(service) => ProviderError::Rejected(detail),
        _ => ProviderError::Transient(detail),
    }
}

#[async_trait]
impl SpeechProvider for PollyProvider {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .synthesize_speech()
            .text(request.text)
            .text_type(TextType::Ssml)
            .output_format(Self::output_format(request.format))
            .voice_id(VoiceId::from(request.voice))
            .engine(Self::engine(request.engine))
            .send()
            .await
            .map_err(classify)?;

        let audio = response
            .audio_stream
            .collect()
            .await
            .map_err(|e| ProviderError::Transient(format!("failed to read audio stream: {}", e)))?;

        Ok(audio.into_bytes().to_vec())
    }

    fn name(&self) -> &str {
        "polly"
    }
}
