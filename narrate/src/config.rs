// narrate configuration management

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::audio::DEFAULT_PAUSE_DURATION;
use crate::story::DEFAULT_SEGMENT_LENGTH;
use crate::tts::command::DEFAULT_COMMAND;
use crate::tts::{AVAILABLE_BACKENDS, BackendOptions, Device};
use crate::voice::DEFAULT_VOICE_PATTERN;

const DEFAULT_BACKEND: &str = "command";
const DEFAULT_OUTPUT_DIR: &str = "voice_output";

pub const CONFIG_KEYS: [&str; 8] = [
    "backend",
    "command",
    "command_args",
    "device",
    "output_dir",
    "segment_length",
    "pause_duration",
    "voice_pattern",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrateConfig {
    /// TTS backend to use
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Program run by the command backend
    #[serde(default = "default_command")]
    pub command: String,

    /// Extra leading arguments for the command backend
    #[serde(default)]
    pub command_args: Vec<String>,

    #[serde(default)]
    pub device: Device,

    /// Where generated audio goes
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Target segment length in characters for auto-ingestion
    #[serde(default = "default_segment_length")]
    pub segment_length: usize,

    /// Silence between segments in the complete file, in seconds
    #[serde(default = "default_pause_duration")]
    pub pause_duration: f32,

    /// Voice styles cycled through during auto-ingestion
    #[serde(default = "default_voice_pattern")]
    pub voice_pattern: Vec<String>,
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_segment_length() -> usize {
    DEFAULT_SEGMENT_LENGTH
}

fn default_pause_duration() -> f32 {
    DEFAULT_PAUSE_DURATION
}

fn default_voice_pattern() -> Vec<String> {
    DEFAULT_VOICE_PATTERN.iter().map(|s| s.to_string()).collect()
}

impl Default for NarrateConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            command: default_command(),
            command_args: Vec::new(),
            device: Device::default(),
            output_dir: default_output_dir(),
            segment_length: default_segment_length(),
            pause_duration: default_pause_duration(),
            voice_pattern: default_voice_pattern(),
        }
    }
}

impl NarrateConfig {
    /// Get the config file path: ~/.config/cli-programs/narrate.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("narrate.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: NarrateConfig =
            toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Update one key from its command-line string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "backend" => {
                if !AVAILABLE_BACKENDS.contains(&value) {
                    bail!(
                        "Unknown TTS backend: {}. Available: {}",
                        value,
                        AVAILABLE_BACKENDS.join(", ")
                    );
                }
                self.backend = value.to_string();
            }
            "command" => self.command = value.to_string(),
            "command_args" => self.command_args = split_list(value, char::is_whitespace),
            "device" => {
                self.device = match value {
                    "cuda" => Device::Cuda,
                    "cpu" => Device::Cpu,
                    _ => bail!("Invalid device. Use 'cuda' or 'cpu'"),
                }
            }
            "output_dir" => self.output_dir = PathBuf::from(value),
            "segment_length" => {
                let length: usize = value.parse().context("segment_length must be a number")?;
                if length == 0 {
                    bail!("segment_length must be greater than zero");
                }
                self.segment_length = length;
            }
            "pause_duration" => {
                let seconds: f32 = value.parse().context("pause_duration must be a number")?;
                if seconds < 0.0 {
                    bail!("pause_duration cannot be negative");
                }
                self.pause_duration = seconds;
            }
            "voice_pattern" => self.voice_pattern = split_list(value, |c| c == ','),
            _ => bail!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Options for [`crate::tts::create_backend`], with an optional device override
    pub fn backend_options(&self, device: Option<Device>) -> BackendOptions {
        BackendOptions {
            command: self.command.clone(),
            command_args: self.command_args.clone(),
            device: device.unwrap_or(self.device),
        }
    }
}

fn split_list(value: &str, separator: impl Fn(char) -> bool) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
