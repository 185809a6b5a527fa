// TTS backend trait and types

pub mod command;
pub mod macos_say;

use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::audio::AudioBuffer;
use crate::voice::SynthesisParams;

/// Compute device requested from the synthesis engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cuda,
    Cpu,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synthesis call
#[derive(Debug, Clone)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    /// Reference audio for voice cloning
    pub audio_prompt: Option<&'a Path>,
    pub params: SynthesisParams,
}

/// TTS backend trait - all TTS engines implement this
#[async_trait]
pub trait TtsBackend: Send + Sync {
    /// Synthesize text to mono samples at the engine's native rate
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<AudioBuffer>;

    /// Backend name
    fn name(&self) -> &str;
}

/// Settings a backend may need when it is created
#[derive(Debug, Clone)]
pub struct BackendOptions {
    /// Program run by the `command` backend
    pub command: String,
    /// Arguments placed before the generated ones
    pub command_args: Vec<String>,
    pub device: Device,
}

pub const AVAILABLE_BACKENDS: [&str; 2] = ["command", "macos-say"];

/// Create a TTS backend by name
pub fn create_backend(name: &str, options: &BackendOptions) -> Result<Box<dyn TtsBackend>> {
    match name {
        "command" => Ok(Box::new(command::CommandBackend::new(
            options.command.clone(),
            options.command_args.clone(),
            options.device,
        ))),
        "macos-say" => Ok(Box::new(macos_say::MacOsSayBackend::new())),
        _ => anyhow::bail!(
            "Unknown TTS backend: {}. Available: {}",
            name,
            AVAILABLE_BACKENDS.join(", ")
        ),
    }
}
