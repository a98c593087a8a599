use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::{InflightSlot, NarrationEngine, NarrationError};

const DEFAULT_VOICE: &str = "es-US-Neural2-B";
const DEFAULT_AUDIO_FORMAT: &str = "audio/mp3";

#[derive(Debug, Clone)]
pub struct RemoteTtsConfig {
    pub endpoint: Url,
    pub voice: String,
    pub speaking_rate: f32,
}

impl RemoteTtsConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            voice: DEFAULT_VOICE.to_string(),
            speaking_rate: 1.0,
        }
    }

    pub fn parse(endpoint: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(endpoint)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub format: String,
}

/// Plays synthesized audio; `play` resolves when playback has ended.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, clip: AudioClip) -> anyhow::Result<()>;
    fn halt(&self);
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice: &'a str,
    speaking_rate: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SynthesizeFailure {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    fallback: bool,
}

/// High-quality narration through an HTTP synthesis service.
pub struct RemoteTtsNarration<S: AudioSink> {
    http: Client,
    config: RemoteTtsConfig,
    sink: S,
    fallback: Option<Arc<dyn NarrationEngine>>,
    inflight: InflightSlot,
}

impl<S: AudioSink> RemoteTtsNarration<S> {
    pub fn new(config: RemoteTtsConfig, sink: S) -> Self {
        Self {
            http: Client::new(),
            config,
            sink,
            fallback: None,
            inflight: InflightSlot::default(),
        }
    }

    /// Engine used whenever the service or playback fails.
    pub fn with_fallback(mut self, fallback: Arc<dyn NarrationEngine>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    async fn synthesize(&self, text: &str) -> Result<AudioClip, NarrationError> {
        let response = self
            .http
            .post(self.config.endpoint.clone())
            .json(&SynthesizeRequest {
                text,
                voice: &self.config.voice,
                speaking_rate: self.config.speaking_rate,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let failure = response
                .json::<SynthesizeFailure>()
                .await
                .unwrap_or_default();
            debug!(
                status = status.as_u16(),
                fallback = failure.fallback,
                "narration: tts service refused request"
            );
            return Err(NarrationError::Service {
                status: status.as_u16(),
                message: failure.error.unwrap_or_else(|| status.to_string()),
            });
        }

        let body: SynthesizeResponse = response.json().await?;
        let bytes = STANDARD
            .decode(body.audio_content.as_bytes())
            .map_err(|err| NarrationError::Payload(err.to_string()))?;
        if bytes.is_empty() {
            return Err(NarrationError::Payload("empty audio content".into()));
        }

        Ok(AudioClip {
            bytes,
            format: body
                .format
                .unwrap_or_else(|| DEFAULT_AUDIO_FORMAT.to_string()),
        })
    }

    async fn synthesize_and_play(&self, text: &str) -> Result<(), NarrationError> {
        let clip = self.synthesize(text).await?;
        self.sink
            .play(clip)
            .await
            .map_err(|err| NarrationError::Playback(err.to_string()))
    }
}

#[async_trait]
impl<S: AudioSink> NarrationEngine for RemoteTtsNarration<S> {
    async fn speak(&self, text: &str) -> Result<(), NarrationError> {
        let (id, released, superseded) = self.inflight.begin();
        if superseded {
            self.sink.halt();
        }

        let outcome = tokio::select! {
            _ = released => {
                debug!(utterance = id, "narration: remote utterance released by stop");
                Ok(())
            }
            result = self.synthesize_and_play(text) => result,
        };
        self.inflight.finish(id);

        match outcome {
            Ok(()) => Ok(()),
            Err(err) => match &self.fallback {
                Some(fallback) => {
                    warn!(error = %err, "narration: remote tts failed, using fallback engine");
                    fallback.speak_and_wait(text).await
                }
                None => Err(err),
            },
        }
    }

    fn stop(&self) {
        self.sink.halt();
        self.inflight.release();
        if let Some(fallback) = &self.fallback {
            fallback.stop();
        }
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
