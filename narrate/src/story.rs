//! Story documents and auto-ingestion
//!
//! A story document is the JSON description of one narration job. It is
//! either written by hand or built from a plain text file by segmenting the
//! text and cycling voice styles over the segments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::NarrateError;
use crate::text;
use crate::voice::{DEFAULT_VOICE_PATTERN, DEFAULT_VOICE_STYLE, TtsParams};

/// Default target segment length in characters
pub const DEFAULT_SEGMENT_LENGTH: usize = 250;

/// Text file extensions accepted for auto-ingestion
pub const SUPPORTED_TEXT_FORMATS: [&str; 2] = [".txt", ".md"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDocument {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub settings: StorySettings,

    /// Also write one concatenated file for the whole story
    #[serde(default = "default_create_full_audio")]
    pub create_full_audio: bool,

    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// Document-wide defaults, overridable per segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_style: Option<String>,

    /// Reference audio for voice cloning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_style: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_params: Option<TtsParams>,
}

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_create_full_audio() -> bool {
    true
}

impl Segment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Segments with only whitespace are skipped during synthesis
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl StoryDocument {
    /// Voice style for a segment: segment, then document, then the default
    pub fn voice_style_for<'a>(&'a self, segment: &'a Segment) -> &'a str {
        segment
            .voice_style
            .as_deref()
            .or(self.settings.voice_style.as_deref())
            .unwrap_or(DEFAULT_VOICE_STYLE)
    }

    /// Audio prompt for a segment: segment, then document
    pub fn audio_prompt_for<'a>(&'a self, segment: &'a Segment) -> Option<&'a str> {
        segment
            .audio_prompt
            .as_deref()
            .or(self.settings.audio_prompt.as_deref())
    }

    /// Load a story document from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NarrateError::FileNotFound(path.to_path_buf()).into());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read story file: {}", path.display()))?;
        let story: StoryDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse story file: {}", path.display()))?;
        Ok(story)
    }

    /// Serialize with 4-space indentation, keeping non-ASCII text as is
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .context("Failed to serialize story")?;
        String::from_utf8(buf).context("Serialized story is not valid UTF-8")
    }

    /// Save to a JSON file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write story file: {}", path.display()))?;
        log::info!("Saved story JSON to: {}", path.display());
        Ok(())
    }
}

/// Options for turning raw text into a story document
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_length: usize,
    pub voice_pattern: Vec<String>,
    pub audio_prompt: Option<String>,
    /// Where to save the generated JSON, if anywhere
    pub save_json: Option<PathBuf>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            target_length: DEFAULT_SEGMENT_LENGTH,
            voice_pattern: DEFAULT_VOICE_PATTERN.iter().map(|s| s.to_string()).collect(),
            audio_prompt: None,
            save_json: None,
        }
    }
}

/// Build a story document from raw text.
///
/// `source_name` is the file name the text came from; it provides the default
/// title and description.
pub fn build_story(text: &str, source_name: &str, options: &IngestOptions) -> StoryDocument {
    let pieces = text::segment(text, options.target_length);

    let segments = pieces
        .into_iter()
        .enumerate()
        .map(|(index, piece)| {
            let style = cycled_style(&options.voice_pattern, index);
            Segment {
                text: piece,
                voice_style: (style != DEFAULT_VOICE_STYLE).then(|| style.to_string()),
                ..Default::default()
            }
        })
        .collect();

    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_name.to_string());

    StoryDocument {
        title: options
            .title
            .clone()
            .unwrap_or_else(|| title_from_stem(&stem)),
        description: options
            .description
            .clone()
            .unwrap_or_else(|| format!("Auto-generated from {}", source_name)),
        settings: StorySettings {
            voice_style: Some(DEFAULT_VOICE_STYLE.to_string()),
            audio_prompt: options.audio_prompt.clone(),
        },
        create_full_audio: true,
        segments,
    }
}

fn cycled_style(pattern: &[String], index: usize) -> &str {
    if pattern.is_empty() {
        return DEFAULT_VOICE_STYLE;
    }
    &pattern[index % pattern.len()]
}

/// Read a text file and build a story document from it
pub fn ingest_text_file(path: &Path, options: &IngestOptions) -> Result<StoryDocument> {
    validate_text_file(path)?;

    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    log::info!("Reading text file: {}", file_name);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read text file: {}", path.display()))?
        .replace("\r\n", "\n");

    log::info!(
        "Splitting text into segments (target length: {} chars)",
        options.target_length
    );
    let story = build_story(&content, &file_name, options);
    log::info!("Generated {} segments from text", story.segments.len());

    if let Some(json_path) = &options.save_json {
        story.save(json_path)?;
    }

    Ok(story)
}

/// Check that a text file exists and has a supported extension
pub fn validate_text_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(NarrateError::FileNotFound(path.to_path_buf()).into());
    }

    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    if !SUPPORTED_TEXT_FORMATS.contains(&extension.as_str()) {
        return Err(NarrateError::UnsupportedFormat {
            extension: if extension.is_empty() {
                "(none)".to_string()
            } else {
                extension
            },
            supported: SUPPORTED_TEXT_FORMATS.join(", "),
        }
        .into());
    }

    Ok(())
}

/// "my_war-story" -> "My War Story"
pub fn title_from_stem(stem: &str) -> String {
    let spaced = stem.replace(['-', '_'], " ");

    let mut title = String::with_capacity(spaced.len());
    let mut prev_is_letter = false;
    for c in spaced.chars() {
        if prev_is_letter {
            title.extend(c.to_lowercase());
        } else {
            title.extend(c.to_uppercase());
        }
        prev_is_letter = c.is_alphabetic();
    }
    title
}
