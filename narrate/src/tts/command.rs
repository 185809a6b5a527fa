// External program TTS backend

use super::{Device, SynthesisRequest, TtsBackend};
use crate::audio::AudioBuffer;
use crate::error::NarrateError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Default program for the `command` backend
pub const DEFAULT_COMMAND: &str = "chatterbox-tts";

/// Runs an external synthesis program once per segment.
///
/// The program receives the text on stdin and these flags:
/// `--output <wav> --device <cuda|cpu> --exaggeration <f> --cfg-weight <f>
/// --temperature <f> [--audio-prompt <path>]`. It must write a WAV file to
/// the output path and exit with status 0.
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    device: Device,
}

impl CommandBackend {
    pub fn new(program: String, args: Vec<String>, device: Device) -> Self {
        Self {
            program,
            args,
            device,
        }
    }

    fn build_command(&self, request: &SynthesisRequest<'_>, output: &std::path::Path) -> Command {
        let params = request.params;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--output")
            .arg(output)
            .arg("--device")
            .arg(self.device.as_str())
            .arg("--exaggeration")
            .arg(params.exaggeration.to_string())
            .arg("--cfg-weight")
            .arg(params.cfg_weight.to_string())
            .arg("--temperature")
            .arg(params.temperature.to_string());

        if let Some(prompt) = request.audio_prompt {
            cmd.arg("--audio-prompt").arg(prompt);
        }

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl TtsBackend for CommandBackend {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<AudioBuffer> {
        let output = NamedTempFile::with_suffix(".wav").context("Failed to create temp file")?;

        log::debug!(
            "Running {} ({} chars, {:?})",
            self.program,
            request.text.chars().count(),
            request.params
        );

        let mut child = self
            .build_command(request, output.path())
            .spawn()
            .with_context(|| format!("Failed to run {}. Is it installed?", self.program))?;

        // Pass text via stdin to avoid argument length and escaping issues
        let write_result = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(request.text.as_bytes()).await,
            None => Ok(()),
        };

        let result = child
            .wait_with_output()
            .await
            .with_context(|| format!("Failed to wait for {}", self.program))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(NarrateError::Synthesis(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            ))
            .into());
        }

        write_result.with_context(|| format!("Failed to write text to {}", self.program))?;

        AudioBuffer::load(output.path())
            .with_context(|| format!("{} did not produce a readable WAV file", self.program))
    }

    fn name(&self) -> &str {
        "command"
    }
}
