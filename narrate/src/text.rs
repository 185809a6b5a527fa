//! Text cleanup and segmentation for narration
//!
//! Raw text is normalized first, then split into segments of roughly
//! `target_length` characters. Paragraph breaks are preferred; sentences are
//! only used to break up paragraphs that are far too long on their own.

use once_cell::sync::Lazy;
use regex::Regex;

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static MULTIPLE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());
static SPACE_BEFORE_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([.!?])").unwrap());
static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Paragraphs longer than this multiple of the target are split by sentence
const LONG_PARAGRAPH_FACTOR: f64 = 1.5;

const PARAGRAPH_SEPARATOR: &str = "\n\n";
const SENTENCE_SEPARATOR: &str = " ";

/// Clean up text before it is handed to a TTS engine.
pub fn normalize(text: &str) -> String {
    let text = EXCESS_NEWLINES.replace_all(text, "\n\n");
    let text = MULTIPLE_SPACES.replace_all(&text, " ");

    let text = text
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    let text = SPACE_BEFORE_PUNCTUATION.replace_all(&text, "$1");

    text.trim().to_string()
}

/// Split text into sentences at `.`, `!` or `?` followed by whitespace.
///
/// The punctuation stays with its sentence; empty pieces are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        // Punctuation is a single byte, so the sentence ends right after it
        let end = boundary.start() + 1;
        push_trimmed(&mut sentences, &text[start..end]);
        start = boundary.end();
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

/// Split text into segments of approximately `target_length` characters.
///
/// Greedy fill: units (whole paragraphs, or sentences of overly long
/// paragraphs) are appended to the current segment until the next one would
/// push it past `target_length`. A unit is always accepted by an empty
/// segment, so a single oversized unit becomes its own segment.
pub fn segment(text: &str, target_length: usize) -> Vec<String> {
    let text = normalize(text);

    let mut segments = Vec::new();
    let mut current = Accumulator::default();

    let long_paragraph = target_length as f64 * LONG_PARAGRAPH_FACTOR;

    for paragraph in text.split(PARAGRAPH_SEPARATOR) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if char_len(paragraph) as f64 > long_paragraph {
            for sentence in split_sentences(paragraph) {
                current.add(&sentence, SENTENCE_SEPARATOR, target_length, &mut segments);
            }
        } else {
            current.add(paragraph, PARAGRAPH_SEPARATOR, target_length, &mut segments);
        }
    }

    current.flush(&mut segments);
    segments
}

/// Segment under construction. Each unit is stored with its trailing separator.
#[derive(Default)]
struct Accumulator {
    text: String,
    chars: usize,
}

impl Accumulator {
    fn add(&mut self, unit: &str, separator: &str, target_length: usize, out: &mut Vec<String>) {
        if self.chars + char_len(unit) > target_length && !self.text.is_empty() {
            self.flush(out);
        }
        self.text.push_str(unit);
        self.text.push_str(separator);
        self.chars += char_len(unit) + char_len(separator);
    }

    fn flush(&mut self, out: &mut Vec<String>) {
        push_trimmed(out, &self.text);
        self.text.clear();
        self.chars = 0;
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
