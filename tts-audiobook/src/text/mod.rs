//! Text processing for TTS: cleaning, sentence detection, and length-bounded segmentation.

mod cleaner;
pub mod segmenter;
pub mod sentences;

use serde::Serialize;
use std::fmt;

pub use cleaner::clean_text;
pub use segmenter::{segment, LongWordPolicy, Segmenter, SegmenterConfig, DEFAULT_MAX_LENGTH};
pub use sentences::{PunctuationSplitter, SeamsSplitter, SentenceSplitter};

/// Characters that end a sentence.
pub const TERMINATORS: &[char] = &['.', '!', '?', '\u{2026}'];

/// Closing characters allowed after a terminator (`"Stop!"` is terminated).
pub const CLOSERS: &[char] = &['"', '\'', ')', ']', '\u{201d}', '\u{2019}'];

/// Whether `text` already ends with a sentence terminator.
pub fn is_terminated(text: &str) -> bool {
    text.trim_end().trim_end_matches(CLOSERS).ends_with(TERMINATORS)
}

/// Append a period unless the text is already terminated.
pub fn ensure_terminal(text: &str) -> String {
    let text = text.trim_end();
    if is_terminated(text) {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// A single TTS-ready unit of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Segment(String);

impl Segment {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        char_len(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The segments of one newline-delimited paragraph. Empty for blank lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentedParagraph {
    pub segments: Vec<Segment>,
}

impl SegmentedParagraph {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments joined with single spaces.
    pub fn to_text(&self) -> String {
        self.segments
            .iter()
            .map(Segment::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Segmented text with the original paragraph structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentedText {
    pub paragraphs: Vec<SegmentedParagraph>,
}

impl SegmentedText {
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    /// All segments in reading order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.paragraphs.iter().flat_map(|p| p.segments.iter())
    }

    pub fn segment_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.segments.len()).sum()
    }

    /// Paragraph texts joined with newlines, blank paragraphs included.
    pub fn to_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(SegmentedParagraph::to_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
