//! Sentence boundary detection behind a narrow interface.
//!
//! The segmenter only needs `split_into_sentences`; any locale-aware tokenizer
//! can be plugged in by implementing [`SentenceSplitter`].

use super::{CLOSERS, TERMINATORS};
use crate::error::{Result, SegmentError};
use once_cell::sync::OnceCell;
use seams::sentence_detector::dialog_detector::SentenceDetectorDialog;

/// Global detector instance, initialized once and read-only afterwards.
static DETECTOR: OnceCell<SentenceDetectorDialog> = OnceCell::new();

fn detector() -> Result<&'static SentenceDetectorDialog> {
    DETECTOR.get_or_try_init(|| {
        SentenceDetectorDialog::new().map_err(|e| SegmentError::Detector(format!("{e:?}")))
    })
}

/// Splits a paragraph into ordered sentences.
pub trait SentenceSplitter: Send + Sync {
    fn split_into_sentences(&self, text: &str) -> Result<Vec<String>>;
}

/// Dialog-aware splitter backed by the seams detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeamsSplitter;

impl SeamsSplitter {
    /// Initialize the shared detector up front so a broken model fails at startup
    /// instead of on the first chapter.
    pub fn init() -> Result<Self> {
        detector()?;
        Ok(Self)
    }
}

impl SentenceSplitter for SeamsSplitter {
    fn split_into_sentences(&self, text: &str) -> Result<Vec<String>> {
        let sentences = detector()?
            .detect_sentences_borrowed(text)
            .map_err(|e| SegmentError::Detector(format!("{e:?}")))?;

        Ok(sentences
            .iter()
            .map(|s| s.normalize())
            .filter(|s| !s.is_empty())
            .collect())
    }
}

/// Splits after a terminator (plus any closing quotes) followed by whitespace.
///
/// Not abbreviation-aware; deterministic, which makes it useful in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationSplitter;

impl SentenceSplitter for PunctuationSplitter {
    fn split_into_sentences(&self, text: &str) -> Result<Vec<String>> {
        let mut sentences = Vec::new();
        let mut current = String::new();
        let mut after_terminator = false;

        for c in text.chars() {
            if after_terminator && c.is_whitespace() {
                push_trimmed(&mut sentences, &current);
                current.clear();
                after_terminator = false;
                continue;
            }

            current.push(c);
            if TERMINATORS.contains(&c) {
                after_terminator = true;
            } else if !CLOSERS.contains(&c) {
                after_terminator = false;
            }
        }
        push_trimmed(&mut sentences, &current);

        Ok(sentences)
    }
}

fn push_trimmed(sentences: &mut Vec<String>, sentence: &str) {
    let trimmed = sentence.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}
