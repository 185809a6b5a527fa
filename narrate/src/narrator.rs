//! Story narration pipeline
//!
//! Walks a story document segment by segment, asks the TTS backend for each
//! clip, writes the clips to the output directory and optionally joins them
//! into one file. Everything runs strictly in order, one call at a time.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::{self, AudioBuffer, DEFAULT_PAUSE_DURATION};
use crate::error::NarrateError;
use crate::story::{self, IngestOptions, Segment, StoryDocument};
use crate::summary::estimate_processing_time;
use crate::tts::{SynthesisRequest, TtsBackend};
use crate::voice::{self, SynthesisParams, TtsParams};

/// A story together with the clips produced for it
#[derive(Debug)]
pub struct Narration {
    pub story: StoryDocument,
    /// Per-segment files in segment order
    pub files: Vec<PathBuf>,
}

/// Effective settings for one segment after applying document defaults
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSegment {
    pub voice_style: String,
    pub audio_prompt: Option<PathBuf>,
    pub params: SynthesisParams,
}

impl ResolvedSegment {
    pub fn resolve(story: &StoryDocument, segment: &Segment) -> Self {
        Self::from_parts(
            story.voice_style_for(segment),
            story.audio_prompt_for(segment),
            segment.tts_params.as_ref(),
        )
    }

    fn from_parts(
        voice_style: &str,
        audio_prompt: Option<&str>,
        overrides: Option<&TtsParams>,
    ) -> Self {
        let mut params = voice::preset(voice_style);
        if let Some(overrides) = overrides {
            params = params.with_overrides(overrides);
        }

        Self {
            voice_style: voice_style.to_string(),
            audio_prompt: audio_prompt.and_then(validate_audio_prompt),
            params,
        }
    }
}

/// Keep an audio prompt only if the file exists
pub fn validate_audio_prompt(path: &str) -> Option<PathBuf> {
    let path = PathBuf::from(path);
    if path.exists() {
        Some(path)
    } else {
        log::warn!(
            "Audio prompt file not found: {}. Proceeding without voice cloning",
            path.display()
        );
        None
    }
}

pub fn segment_file_name(story_name: &str, index: usize) -> String {
    format!("{}_segment_{:03}.wav", story_name, index)
}

pub fn complete_file_name(story_name: &str) -> String {
    format!("{}_complete.wav", story_name)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "story".to_string())
}

pub struct Narrator {
    backend: Box<dyn TtsBackend>,
    output_dir: PathBuf,
    pause_duration: f32,
    show_progress: bool,
}

impl Narrator {
    /// Create a narrator writing into `output_dir`, creating it if needed
    pub fn new(backend: Box<dyn TtsBackend>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?;

        Ok(Self {
            backend,
            output_dir,
            pause_duration: DEFAULT_PAUSE_DURATION,
            show_progress: false,
        })
    }

    /// Silence between segments in the complete file, in seconds
    pub fn with_pause_duration(mut self, seconds: f32) -> Self {
        self.pause_duration = seconds;
        self
    }

    /// Draw a progress bar while segments are synthesized
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Synthesize one piece of text outside of any story
    pub async fn synthesize_segment(
        &self,
        text: &str,
        voice_style: &str,
        audio_prompt: Option<&str>,
        overrides: Option<&TtsParams>,
    ) -> Result<AudioBuffer> {
        let resolved = ResolvedSegment::from_parts(voice_style, audio_prompt, overrides);
        self.synthesize_resolved(text, &resolved).await
    }

    async fn synthesize_resolved(&self, text: &str, resolved: &ResolvedSegment) -> Result<AudioBuffer> {
        let request = SynthesisRequest {
            text,
            audio_prompt: resolved.audio_prompt.as_deref(),
            params: resolved.params,
        };
        self.backend.synthesize(&request).await
    }

    /// Narrate a story, returning the per-segment files in order.
    ///
    /// Blank segments are skipped; files are numbered by the segment's
    /// position in the document, so skipped segments leave gaps.
    pub async fn process_story(&self, story: &StoryDocument, name: &str) -> Result<Vec<PathBuf>> {
        let total = story.segments.len();
        log::info!("Processing story: {}", story.title);
        log::info!(
            "Generating audio for {} segments (estimated {})...",
            total,
            estimate_processing_time(total)
        );

        let pb = self.progress_bar(total as u64);
        let mut files = Vec::new();

        for (i, segment) in story.segments.iter().enumerate() {
            let number = i + 1;

            if segment.is_blank() {
                log::debug!("Skipping blank segment {}", number);
                pb.inc(1);
                continue;
            }

            let resolved = ResolvedSegment::resolve(story, segment);
            pb.set_message(format!("{} style", resolved.voice_style));
            pb.suspend(|| {
                log::info!(
                    "Processing segment {}/{}: {} style",
                    number,
                    total,
                    resolved.voice_style
                )
            });

            let audio = self
                .synthesize_resolved(&segment.text, &resolved)
                .await
                .with_context(|| format!("Failed to synthesize segment {}", number))?;

            let file_name = segment_file_name(name, number);
            let path = self.output_dir.join(&file_name);
            audio.save(&path)?;
            files.push(path);

            pb.suspend(|| log::info!("Saved: {}", file_name));
            pb.inc(1);
        }

        pb.finish_and_clear();

        if story.create_full_audio && !files.is_empty() {
            let complete = self.output_dir.join(complete_file_name(name));
            audio::concatenate_files(&files, &complete, self.pause_duration)?;
        }

        Ok(files)
    }

    /// Load a story document and narrate it under its file stem
    pub async fn process_story_file(&self, json_path: &Path) -> Result<Narration> {
        let story = StoryDocument::load(json_path)?;
        let files = self.process_story(&story, &file_stem(json_path)).await?;
        Ok(Narration { story, files })
    }

    /// Auto-ingest a text file and narrate the result.
    ///
    /// `name` defaults to the text file's stem.
    pub async fn process_text_file(
        &self,
        text_path: &Path,
        name: Option<&str>,
        options: &IngestOptions,
    ) -> Result<Narration> {
        let story = story::ingest_text_file(text_path, options)?;
        let name = name.map(str::to_string).unwrap_or_else(|| file_stem(text_path));
        let files = self.process_story(&story, &name).await?;
        Ok(Narration { story, files })
    }

    /// Narrate every `*.json` story in a directory.
    ///
    /// A failing story is logged and recorded with no files; the others
    /// still run. Keys are file stems.
    pub async fn process_batch(&self, dir: &Path) -> Result<BTreeMap<String, Vec<PathBuf>>> {
        if !dir.is_dir() {
            return Err(NarrateError::FileNotFound(dir.to_path_buf()).into());
        }

        let mut json_files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        json_files.sort();

        let mut results = BTreeMap::new();

        if json_files.is_empty() {
            log::warn!("No JSON files found in {}", dir.display());
            return Ok(results);
        }

        log::info!("Found {} story files to process...", json_files.len());

        for json_file in json_files {
            let name = file_stem(&json_file);
            let display_name = json_file
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.clone());

            log::info!("Processing: {}", display_name);

            match self.process_story_file(&json_file).await {
                Ok(narration) => {
                    log::info!("Successfully processed {}", display_name);
                    results.insert(name, narration.files);
                }
                Err(source) => {
                    let err = NarrateError::Document {
                        name: display_name,
                        source,
                    };
                    log::error!("{}", err);
                    results.insert(name, Vec::new());
                }
            }
        }

        Ok(results)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::StorySettings;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const RATE: u32 = 1000;
    const SAMPLES_PER_CHAR: usize = 10;

    #[derive(Debug, Clone)]
    struct Call {
        text: String,
        audio_prompt: Option<PathBuf>,
        params: SynthesisParams,
    }

    /// Backend producing `SAMPLES_PER_CHAR` samples per input character
    #[derive(Default)]
    struct FakeBackend {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl TtsBackend for FakeBackend {
        async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<AudioBuffer> {
            self.calls.lock().unwrap().push(Call {
                text: request.text.to_string(),
                audio_prompt: request.audio_prompt.map(Path::to_path_buf),
                params: request.params,
            });

            if let Some(marker) = &self.fail_on {
                if request.text.contains(marker.as_str()) {
                    return Err(NarrateError::Synthesis("engine crashed".to_string()).into());
                }
            }

            Ok(AudioBuffer::new(
                vec![0.25; request.text.chars().count() * SAMPLES_PER_CHAR],
                RATE,
            ))
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn narrator(dir: &Path) -> (Narrator, Arc<Mutex<Vec<Call>>>) {
        narrator_failing_on(dir, None)
    }

    fn narrator_failing_on(dir: &Path, marker: Option<&str>) -> (Narrator, Arc<Mutex<Vec<Call>>>) {
        let backend = FakeBackend {
            fail_on: marker.map(str::to_string),
            ..Default::default()
        };
        let calls = backend.calls.clone();
        let narrator = Narrator::new(Box::new(backend), dir.join("out")).unwrap();
        (narrator, calls)
    }

    fn story(segments: Vec<Segment>) -> StoryDocument {
        StoryDocument {
            title: "Test Story".to_string(),
            description: String::new(),
            settings: StorySettings::default(),
            create_full_audio: true,
            segments,
        }
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_file_names() {
        assert_eq!(segment_file_name("war", 1), "war_segment_001.wav");
        assert_eq!(segment_file_name("war", 42), "war_segment_042.wav");
        assert_eq!(segment_file_name("war", 1234), "war_segment_1234.wav");
        assert_eq!(complete_file_name("war"), "war_complete.wav");
    }

    #[test]
    fn test_new_creates_output_dir() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, _) = narrator(temp_dir.path());
        assert!(narrator.output_dir().is_dir());
        assert_eq!(narrator.backend_name(), "fake");
    }

    #[tokio::test]
    async fn test_process_story_writes_segments_and_complete_file() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, calls) = narrator(temp_dir.path());
        let story = story(vec![Segment::new("One"), Segment::new("Three")]);

        let files = narrator.process_story(&story, "tale").await.unwrap();
        assert_eq!(names(&files), vec!["tale_segment_001.wav", "tale_segment_002.wav"]);
        assert!(files.iter().all(|f| f.exists()));
        assert_eq!(calls.lock().unwrap().len(), 2);

        let complete = AudioBuffer::load(narrator.output_dir().join("tale_complete.wav")).unwrap();
        let pause = (DEFAULT_PAUSE_DURATION * RATE as f32) as usize;
        assert_eq!(complete.len(), (3 + 5) * SAMPLES_PER_CHAR + pause);
        assert_eq!(complete.sample_rate, RATE);
    }

    #[tokio::test]
    async fn test_blank_segments_are_skipped_with_numbering_gaps() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, calls) = narrator(temp_dir.path());
        let story = story(vec![
            Segment::new("First"),
            Segment::new("   \n "),
            Segment::new(""),
            Segment::new("Fourth"),
        ]);

        let files = narrator.process_story(&story, "gaps").await.unwrap();
        assert_eq!(names(&files), vec!["gaps_segment_001.wav", "gaps_segment_004.wav"]);
        assert!(!narrator.output_dir().join("gaps_segment_002.wav").exists());

        let texts: Vec<String> = calls.lock().unwrap().iter().map(|c| c.text.clone()).collect();
        assert_eq!(texts, vec!["First", "Fourth"]);
    }

    #[tokio::test]
    async fn test_no_complete_file_when_disabled_or_empty() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, _) = narrator(temp_dir.path());

        let mut disabled = story(vec![Segment::new("Only")]);
        disabled.create_full_audio = false;
        let files = narrator.process_story(&disabled, "off").await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(!narrator.output_dir().join("off_complete.wav").exists());

        let blank = story(vec![Segment::new(" ")]);
        let files = narrator.process_story(&blank, "blank").await.unwrap();
        assert!(files.is_empty());
        assert!(!narrator.output_dir().join("blank_complete.wav").exists());
    }

    #[tokio::test]
    async fn test_custom_pause_duration() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, _) = narrator(temp_dir.path());
        let narrator = narrator.with_pause_duration(2.0);

        let story = story(vec![Segment::new("ab"), Segment::new("cd"), Segment::new("ef")]);
        narrator.process_story(&story, "slow").await.unwrap();

        let complete = AudioBuffer::load(narrator.output_dir().join("slow_complete.wav")).unwrap();
        assert_eq!(complete.len(), 6 * SAMPLES_PER_CHAR + 2 * 2000);
    }

    #[tokio::test]
    async fn test_segment_settings_resolution() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, calls) = narrator(temp_dir.path());

        let prompt = temp_dir.path().join("narrator.wav");
        fs::write(&prompt, b"fake").unwrap();

        let mut story = story(vec![
            Segment::new("Uses defaults"),
            Segment {
                voice_style: Some("neutral".to_string()),
                tts_params: Some(TtsParams {
                    cfg_weight: Some(0.1),
                    ..Default::default()
                }),
                ..Segment::new("Overrides")
            },
            Segment {
                audio_prompt: Some("/nonexistent/voice.wav".to_string()),
                ..Segment::new("Missing prompt")
            },
        ]);
        story.settings.voice_style = Some("calm".to_string());
        story.settings.audio_prompt = Some(prompt.to_string_lossy().into_owned());

        narrator.process_story(&story, "resolve").await.unwrap();
        let calls = calls.lock().unwrap();

        assert_eq!(calls[0].params, voice::preset("calm"));
        assert_eq!(calls[0].audio_prompt.as_deref(), Some(prompt.as_path()));

        assert_eq!(calls[1].params.exaggeration, 0.5);
        assert_eq!(calls[1].params.cfg_weight, 0.1);

        // A missing prompt degrades to no voice cloning instead of failing
        assert_eq!(calls[2].audio_prompt, None);
        assert_eq!(calls[2].params, voice::preset("calm"));
    }

    #[tokio::test]
    async fn test_synthesis_failure_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, calls) = narrator_failing_on(temp_dir.path(), Some("boom"));
        let story = story(vec![
            Segment::new("fine"),
            Segment::new("boom"),
            Segment::new("never reached"),
        ]);

        let err = narrator.process_story(&story, "fail").await.unwrap_err();
        assert!(err.to_string().contains("segment 2"));
        assert!(err.chain().any(|c| matches!(
            c.downcast_ref::<NarrateError>(),
            Some(NarrateError::Synthesis(_))
        )));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_synthesize_segment() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, calls) = narrator(temp_dir.path());

        let audio = narrator
            .synthesize_segment("Hello", "calm", None, None)
            .await
            .unwrap();
        assert_eq!(audio.len(), 5 * SAMPLES_PER_CHAR);
        assert_eq!(calls.lock().unwrap()[0].params, voice::preset("calm"));
    }

    #[tokio::test]
    async fn test_process_story_file_uses_stem() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, _) = narrator(temp_dir.path());

        let path = temp_dir.path().join("dispatch.json");
        story(vec![Segment::new("Report")]).save(&path).unwrap();

        let narration = narrator.process_story_file(&path).await.unwrap();
        assert_eq!(narration.story.title, "Test Story");
        assert_eq!(names(&narration.files), vec!["dispatch_segment_001.wav"]);
        assert!(narrator.output_dir().join("dispatch_complete.wav").exists());
    }

    #[tokio::test]
    async fn test_process_story_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, calls) = narrator(temp_dir.path());

        let err = narrator
            .process_story_file(&temp_dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(NarrateError::is_not_found(&err));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_process_text_file() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, calls) = narrator(temp_dir.path());

        let text_path = temp_dir.path().join("field_notes.txt");
        fs::write(&text_path, "Morning came.\n\n\n\nThe guns were silent.").unwrap();

        let options = IngestOptions {
            target_length: 15,
            ..Default::default()
        };
        let narration = narrator.process_text_file(&text_path, None, &options).await.unwrap();
        assert_eq!(narration.story.title, "Field Notes");
        assert_eq!(
            names(&narration.files),
            vec!["field_notes_segment_001.wav", "field_notes_segment_002.wav"]
        );

        {
            let calls = calls.lock().unwrap();
            assert_eq!(calls[0].params, voice::preset("neutral"));
            assert_eq!(calls[1].params, voice::preset("calm"));
        }

        let renamed = narrator
            .process_text_file(&text_path, Some("custom"), &options)
            .await
            .unwrap();
        assert_eq!(names(&renamed.files)[0], "custom_segment_001.wav");
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, calls) = narrator_failing_on(temp_dir.path(), Some("FAIL"));

        let stories_dir = temp_dir.path().join("stories");
        fs::create_dir(&stories_dir).unwrap();
        story(vec![Segment::new("alpha")])
            .save(&stories_dir.join("a_first.json"))
            .unwrap();
        story(vec![Segment::new("FAIL here")])
            .save(&stories_dir.join("b_second.json"))
            .unwrap();
        story(vec![Segment::new("charlie")])
            .save(&stories_dir.join("c_third.json"))
            .unwrap();
        fs::write(stories_dir.join("readme.txt"), "not a story").unwrap();

        let results = narrator.process_batch(&stories_dir).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(names(&results["a_first"]), vec!["a_first_segment_001.wav"]);
        assert!(results["b_second"].is_empty());
        assert_eq!(names(&results["c_third"]), vec!["c_third_segment_001.wav"]);

        // The third story ran after the second failed
        let texts: Vec<String> = calls.lock().unwrap().iter().map(|c| c.text.clone()).collect();
        assert_eq!(texts, vec!["alpha", "FAIL here", "charlie"]);
    }

    #[tokio::test]
    async fn test_batch_isolates_unparseable_documents() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, _) = narrator(temp_dir.path());

        let stories_dir = temp_dir.path().join("stories");
        fs::create_dir(&stories_dir).unwrap();
        fs::write(stories_dir.join("broken.json"), "{ not json").unwrap();
        story(vec![Segment::new("fine")])
            .save(&stories_dir.join("good.json"))
            .unwrap();

        let results = narrator.process_batch(&stories_dir).await.unwrap();
        assert!(results["broken"].is_empty());
        assert_eq!(results["good"].len(), 1);
    }

    #[tokio::test]
    async fn test_batch_empty_and_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let (narrator, _) = narrator(temp_dir.path());

        let empty = temp_dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        assert!(narrator.process_batch(&empty).await.unwrap().is_empty());

        let err = narrator
            .process_batch(&temp_dir.path().join("missing"))
            .await
            .unwrap_err();
        assert!(NarrateError::is_not_found(&err));
    }
}
