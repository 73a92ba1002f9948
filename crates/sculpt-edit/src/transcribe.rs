//! Voice commands
//!
//! Speech-to-text is an external collaborator; the engine only sees text.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use sculpt_core::{CancelToken, SculptError, SculptResult};

use crate::{EditEngine, EditOutcome};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionError {
    #[error("no speech detected")]
    NoSpeech,

    #[error("unsupported audio: {0}")]
    UnsupportedAudio(String),

    #[error("transcriber unavailable: {0}")]
    Unavailable(String),
}

/// Speech-to-text service
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError>;
}

impl EditEngine {
    /// Transcribe `audio` and apply it against the current head
    pub async fn apply_voice(
        &self,
        transcriber: &dyn Transcriber,
        audio: &[u8],
        cancel: &CancelToken,
    ) -> SculptResult<EditOutcome> {
        let text = cancel
            .run(transcriber.transcribe(audio))
            .await?
            .map_err(|e| SculptError::Transcription(e.to_string()))?;

        if text.trim().is_empty() {
            return Err(SculptError::Transcription(TranscriptionError::NoSpeech.to_string()));
        }
        info!(chars = text.chars().count(), "voice command transcribed");

        let command = self.command_for_head(text)?;
        self.apply_command(&command, cancel).await
    }
}
