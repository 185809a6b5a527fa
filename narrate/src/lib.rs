//! Turn long-form text into narrated audio.
//!
//! Text is normalized and segmented, wrapped into a [`story::StoryDocument`],
//! and narrated segment by segment through a [`tts::TtsBackend`]. The
//! resulting clips can be joined into a single WAV file.

pub mod audio;
pub mod config;
pub mod error;
pub mod narrator;
pub mod story;
pub mod summary;
pub mod text;
pub mod tts;
pub mod voice;

pub use error::NarrateError;
pub use narrator::{Narration, Narrator};
pub use story::{IngestOptions, Segment, StoryDocument};
