// macOS say command TTS backend

use super::{SynthesisRequest, TtsBackend};
use crate::audio::AudioBuffer;
use crate::error::NarrateError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;

/// Sample rate requested from `say`
const SAY_SAMPLE_RATE: u32 = 22050;

/// macOS TTS backend using the `say` command.
///
/// Style parameters and audio prompts have no `say` equivalent and are ignored.
pub struct MacOsSayBackend;

impl MacOsSayBackend {
    pub fn new() -> Self {
        Self
    }

    fn data_format() -> String {
        format!("--data-format=LEI16@{}", SAY_SAMPLE_RATE)
    }
}

impl Default for MacOsSayBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsBackend for MacOsSayBackend {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<AudioBuffer> {
        if let Some(prompt) = request.audio_prompt {
            log::warn!(
                "macos-say does not support voice cloning, ignoring {}",
                prompt.display()
            );
        }
        log::debug!("macos-say ignores style parameters {:?}", request.params);

        let output = NamedTempFile::with_suffix(".wav").context("Failed to create temp file")?;

        let mut cmd = Command::new("say");
        cmd.arg("-o")
            .arg(output.path())
            .arg(Self::data_format())
            .stdin(std::process::Stdio::piped());

        let mut child = cmd.spawn().context("Failed to spawn say command")?;

        // Write text to stdin
        if let Some(mut stdin) = child.stdin.take() {
            use tokio::io::AsyncWriteExt;
            stdin
                .write_all(request.text.as_bytes())
                .await
                .context("Failed to write to say stdin")?;
        }

        let status = child.wait().await.context("Failed to wait for say")?;

        if !status.success() {
            return Err(NarrateError::Synthesis(format!(
                "say command failed with status: {}",
                status
            ))
            .into());
        }

        AudioBuffer::load(output.path())
    }

    fn name(&self) -> &str {
        "macos-say"
    }
}
