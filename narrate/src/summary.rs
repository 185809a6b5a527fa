// Timing estimates and end-of-run reporting

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Rough synthesis cost per segment, used for the up-front estimate
pub const AVG_SEGMENT_SECONDS: f64 = 7.0;

/// Format seconds as "12.3s", "4m 5s" or "1h 2m"
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0).floor();
        let secs = (seconds % 60.0).floor();
        format!("{:.0}m {:.0}s", minutes, secs)
    } else {
        let hours = (seconds / 3600.0).floor();
        let minutes = ((seconds % 3600.0) / 60.0).floor();
        format!("{:.0}h {:.0}m", hours, minutes)
    }
}

/// Expected wall time for synthesizing `segments` segments
pub fn estimate_processing_time(segments: usize) -> String {
    format_duration(segments as f64 * AVG_SEGMENT_SECONDS)
}

/// Sorted `.wav` files directly inside `dir`; empty if it does not exist
pub fn list_audio_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .collect();
    files.sort();
    files
}

/// Total size of the given files in megabytes; missing files count as zero
pub fn total_size_mb(files: &[PathBuf]) -> f64 {
    let bytes: u64 = files
        .iter()
        .filter_map(|f| fs::metadata(f).ok())
        .map(|m| m.len())
        .sum();
    bytes as f64 / (1024.0 * 1024.0)
}

/// What gets printed once a story has been narrated
#[derive(Debug)]
pub struct ProcessingSummary<'a> {
    pub title: &'a str,
    pub segments: usize,
    pub files: &'a [PathBuf],
    pub elapsed: Option<Duration>,
    pub output_dir: &'a Path,
}

impl fmt::Display for ProcessingSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "Processing complete!")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Story: {}", self.title)?;
        writeln!(f, "Segments: {}", self.segments)?;
        writeln!(f, "Audio files: {}", self.files.len())?;
        if !self.files.is_empty() {
            writeln!(f, "Total size: {:.1} MB", total_size_mb(self.files))?;
        }
        if let Some(elapsed) = self.elapsed {
            writeln!(f, "Processing time: {}", format_duration(elapsed.as_secs_f64()))?;
        }
        writeln!(f, "Output directory: {}", self.output_dir.display())?;
        write!(f, "{}", rule)
    }
}
