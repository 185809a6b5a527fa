// Typed failure kinds for the narration pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors callers may want to tell apart.
///
/// Everything else travels as a plain `anyhow::Error` with context; these
/// are raised through `anyhow` too and recovered with `downcast_ref`.
#[derive(Debug, Error)]
pub enum NarrateError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Unsupported file format: {extension} (supported: {supported})")]
    UnsupportedFormat { extension: String, supported: String },

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Failed to process {name}: {source:#}")]
    Document {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl NarrateError {
    /// First `NarrateError` in the chain of `err`, if any
    pub fn find(err: &anyhow::Error) -> Option<&NarrateError> {
        err.chain().find_map(|cause| cause.downcast_ref::<NarrateError>())
    }

    /// True when `err` (or anything in its chain) is a missing-file error.
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        matches!(Self::find(err), Some(NarrateError::FileNotFound(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_not_found_message() {
        let err = NarrateError::FileNotFound(PathBuf::from("story.txt"));
        assert_eq!(err.to_string(), "File not found: story.txt");
    }

    #[test]
    fn test_is_not_found_through_context() {
        let result: anyhow::Result<()> =
            Err(NarrateError::FileNotFound(PathBuf::from("a.json")).into());
        let err = result.context("Failed to load story").unwrap_err();
        assert!(NarrateError::is_not_found(&err));

        let other = anyhow::anyhow!("something else");
        assert!(!NarrateError::is_not_found(&other));
    }

    #[test]
    fn test_document_error_includes_name_and_cause() {
        let err = NarrateError::Document {
            name: "chapter_two".to_string(),
            source: anyhow::anyhow!("backend exploded"),
        };
        let message = err.to_string();
        assert!(message.contains("chapter_two"));
        assert!(message.contains("backend exploded"));
    }
}
