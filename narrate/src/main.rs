// narrate - Convert long-form text into narrated audio using text-to-speech

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use narrate::config::NarrateConfig;
use narrate::narrator::validate_audio_prompt;
use narrate::story::{self, StoryDocument};
use narrate::summary::{self, ProcessingSummary};
use narrate::tts::{self, Device};
use narrate::{IngestOptions, Narration, NarrateError, Narrator};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "narrate")]
#[command(about = "Convert long-form text into narrated audio using text-to-speech", long_about = None)]
#[command(version)]
struct Args {
    /// TTS backend to use (command, macos-say)
    #[arg(short, long, global = true)]
    backend: Option<String>,

    /// Directory for generated audio files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Automatic processing for large texts
    Auto {
        /// Text file to process (.txt or .md)
        input_file: PathBuf,

        /// Reference audio file for voice cloning
        #[arg(long)]
        voice_prompt: Option<String>,

        /// Processing device
        #[arg(long, value_enum)]
        device: Option<Device>,

        /// Story title (default: derived from the file name)
        #[arg(long)]
        title: Option<String>,

        /// Target segment length in characters
        #[arg(long)]
        segment_length: Option<usize>,

        /// Also save the generated story JSON to this path
        #[arg(long)]
        save_json: Option<PathBuf>,
    },

    /// Manual processing for small texts
    Manual {
        /// Text to convert to speech
        text: String,

        /// Voice style
        #[arg(long, value_enum, default_value_t = VoiceStyle::Neutral)]
        voice_style: VoiceStyle,

        /// Reference audio file for voice cloning
        #[arg(long)]
        voice_prompt: Option<String>,

        /// Output audio file
        #[arg(short, long, default_value = "output.wav")]
        output: PathBuf,

        /// Processing device
        #[arg(long, value_enum)]
        device: Option<Device>,
    },

    /// Convert a text file into a story JSON without synthesizing
    Ingest {
        /// Text file to convert (.txt or .md)
        input_file: PathBuf,

        /// Output JSON path (default: <input-name>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Story title (default: derived from the file name)
        #[arg(long)]
        title: Option<String>,

        /// Story description
        #[arg(long)]
        description: Option<String>,

        /// Reference audio file recorded in the story settings
        #[arg(long)]
        voice_prompt: Option<String>,

        /// Target segment length in characters
        #[arg(long)]
        segment_length: Option<usize>,
    },

    /// Narrate a story JSON file
    Story {
        /// Story JSON file
        json_file: PathBuf,

        /// Processing device
        #[arg(long, value_enum)]
        device: Option<Device>,
    },

    /// Narrate every story JSON file in a directory
    Batch {
        /// Directory containing story JSON files
        directory: PathBuf,

        /// Processing device
        #[arg(long, value_enum)]
        device: Option<Device>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (backend, command, command_args, device, output_dir,
        /// segment_length, pause_duration, voice_pattern)
        key: String,
        /// Value to set
        value: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VoiceStyle {
    /// Balanced delivery
    Neutral,
    /// Softer, steadier delivery
    Calm,
}

impl VoiceStyle {
    fn as_str(&self) -> &'static str {
        match self {
            VoiceStyle::Neutral => "neutral",
            VoiceStyle::Calm => "calm",
        }
    }
}

/// Settings shared by every narration command
struct Runtime {
    config: NarrateConfig,
    backend: String,
    output_dir: PathBuf,
}

impl Runtime {
    fn narrator(&self, device: Option<Device>) -> Result<Narrator> {
        let backend = tts::create_backend(&self.backend, &self.config.backend_options(device))?;
        log::debug!(
            "Backend: {}, device: {}",
            backend.name(),
            device.unwrap_or(self.config.device)
        );

        Ok(Narrator::new(backend, &self.output_dir)?
            .with_pause_duration(self.config.pause_duration)
            .with_progress(true))
    }

    fn ingest_options(&self, segment_length: Option<usize>) -> IngestOptions {
        IngestOptions {
            target_length: segment_length.unwrap_or(self.config.segment_length),
            voice_pattern: self.config.voice_pattern.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let Some(command) = args.command else {
        Args::command().print_long_help()?;
        return Ok(());
    };

    // Handle config subcommands
    if let Commands::Config { action } = &command {
        return handle_config_command(action);
    }

    let config = NarrateConfig::load().context("Failed to load configuration")?;
    let runtime = Runtime {
        backend: args.backend.unwrap_or_else(|| config.backend.clone()),
        output_dir: args.output_dir.unwrap_or_else(|| config.output_dir.clone()),
        config,
    };

    let result = run(&runtime, command).await;

    // A missing input is reported, not treated as a crash
    match result {
        Err(err) if NarrateError::is_not_found(&err) => {
            if let Some(not_found) = NarrateError::find(&err) {
                eprintln!("Error: {}", not_found);
            }
            Ok(())
        }
        other => other,
    }
}

async fn run(runtime: &Runtime, command: Commands) -> Result<()> {
    match command {
        Commands::Auto {
            input_file,
            voice_prompt,
            device,
            title,
            segment_length,
            save_json,
        } => {
            story::validate_text_file(&input_file)?;

            let options = IngestOptions {
                title,
                audio_prompt: voice_prompt.as_deref().and_then(|p| {
                    validate_audio_prompt(p).map(|_| p.to_string())
                }),
                save_json,
                ..runtime.ingest_options(segment_length)
            };

            log::info!("Processing text: {}", input_file.display());
            let narrator = runtime.narrator(device)?;

            let started = Instant::now();
            let narration = narrator
                .process_text_file(&input_file, None, &options)
                .await?;

            println!("Generated {} audio files", narration.files.len());
            print_summary(&narration, started, narrator.output_dir());
            Ok(())
        }
        Commands::Manual {
            text,
            voice_style,
            voice_prompt,
            output,
            device,
        } => {
            if text.trim().is_empty() {
                bail!("Text to synthesize is empty");
            }

            log::info!("Generating audio with {} style", voice_style.as_str());
            let narrator = runtime.narrator(device)?;

            let audio = narrator
                .synthesize_segment(&text, voice_style.as_str(), voice_prompt.as_deref(), None)
                .await
                .context("Failed to synthesize audio")?;

            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
            audio.save(&output)?;

            println!("Audio saved: {} ({:.1}s)", output.display(), audio.duration());
            Ok(())
        }
        Commands::Ingest {
            input_file,
            output,
            title,
            description,
            voice_prompt,
            segment_length,
        } => {
            let output = output.unwrap_or_else(|| input_file.with_extension("json"));
            let options = IngestOptions {
                title,
                description,
                audio_prompt: voice_prompt,
                save_json: Some(output.clone()),
                ..runtime.ingest_options(segment_length)
            };

            let story = story::ingest_text_file(&input_file, &options)?;

            println!(
                "Story: \"{}\" ({} segments, estimated {})",
                story.title,
                story.segments.len(),
                summary::estimate_processing_time(story.segments.len())
            );
            println!("Saved: {}", output.display());
            Ok(())
        }
        Commands::Story { json_file, device } => {
            if !json_file.exists() {
                return Err(NarrateError::FileNotFound(json_file).into());
            }

            let narrator = runtime.narrator(device)?;
            let started = Instant::now();
            let narration = narrator.process_story_file(&json_file).await?;

            print_summary(&narration, started, narrator.output_dir());
            Ok(())
        }
        Commands::Batch { directory, device } => {
            if !directory.is_dir() {
                return Err(NarrateError::FileNotFound(directory).into());
            }

            let narrator = runtime.narrator(device)?;
            let started = Instant::now();
            let results = narrator.process_batch(&directory).await?;

            println!();
            println!("Batch complete: {} stories", results.len());
            for (name, files) in &results {
                if files.is_empty() {
                    println!("  {}: failed or produced no audio", name);
                } else {
                    println!("  {}: {} audio files", name, files.len());
                }
            }
            println!(
                "Output directory: {} ({} audio files, {})",
                narrator.output_dir().display(),
                summary::list_audio_files(narrator.output_dir()).len(),
                summary::format_duration(started.elapsed().as_secs_f64())
            );
            Ok(())
        }
        Commands::Config { action } => handle_config_command(&action),
    }
}

fn print_summary(narration: &Narration, started: Instant, output_dir: &Path) {
    let story: &StoryDocument = &narration.story;
    let summary = ProcessingSummary {
        title: &story.title,
        segments: story.segments.len(),
        files: &narration.files,
        elapsed: Some(started.elapsed()),
        output_dir,
    };
    println!();
    println!("{}", summary);
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = NarrateConfig::load()?;
            println!("Configuration file: {}", NarrateConfig::config_path()?.display());
            println!();
            println!("backend = \"{}\"", config.backend);
            println!("command = \"{}\"", config.command);
            if !config.command_args.is_empty() {
                println!("command_args = {:?}", config.command_args);
            }
            println!("device = \"{}\"", config.device);
            println!("output_dir = \"{}\"", config.output_dir.display());
            println!("segment_length = {}", config.segment_length);
            println!("pause_duration = {}", config.pause_duration);
            println!("voice_pattern = {:?}", config.voice_pattern);
        }
        ConfigAction::Set { key, value } => {
            let mut config = NarrateConfig::load()?;
            config.set(key, value)?;
            config.save()?;
            println!("Configuration updated: {} = {}", key, value);
        }
    }
    Ok(())
}
