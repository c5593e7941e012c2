//! Length-bounded segmentation of extracted chapter text.
//!
//! Paragraphs (newline-delimited) are split into sentences, and sentences longer
//! than `max_length` characters are broken at commas, then spaces, each fragment
//! ending in terminal punctuation.

use super::sentences::SentenceSplitter;
use super::{char_len, ensure_terminal, is_terminated, Segment, SegmentedParagraph, SegmentedText};
use crate::error::{Result, SegmentError};
use serde::{Deserialize, Serialize};

/// Default upper bound for a segment, in characters.
pub const DEFAULT_MAX_LENGTH: usize = 250;

/// What to do when no comma or space exists inside the `max_length` window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LongWordPolicy {
    /// Move the cut forward to the next delimiter; a lone token stays whole.
    #[default]
    Keep,
    /// Cut at `max_length - 1` characters so the fragment plus its period fits.
    HardCut,
}

/// Segmenter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmenterConfig {
    max_length: usize,
    long_words: LongWordPolicy,
}

impl SegmenterConfig {
    /// Rejects a zero `max_length`.
    pub fn new(max_length: usize) -> Result<Self> {
        if max_length == 0 {
            return Err(SegmentError::InvalidMaxLength(max_length));
        }
        Ok(Self {
            max_length,
            long_words: LongWordPolicy::default(),
        })
    }

    pub fn with_long_word_policy(mut self, policy: LongWordPolicy) -> Self {
        self.long_words = policy;
        self
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn long_word_policy(&self) -> LongWordPolicy {
        self.long_words
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            long_words: LongWordPolicy::default(),
        }
    }
}

/// Splits text into TTS-ready segments.
#[derive(Debug, Clone)]
pub struct Segmenter<S> {
    splitter: S,
    config: SegmenterConfig,
}

impl<S: SentenceSplitter> Segmenter<S> {
    pub fn new(splitter: S, config: SegmenterConfig) -> Self {
        Self { splitter, config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Segment `text`, keeping one entry per newline-delimited paragraph.
    pub fn segment(&self, text: &str) -> Result<SegmentedText> {
        let mut paragraphs = Vec::new();

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            paragraphs.push(self.segment_paragraph(line)?);
        }

        Ok(SegmentedText { paragraphs })
    }

    fn segment_paragraph(&self, paragraph: &str) -> Result<SegmentedParagraph> {
        if paragraph.trim().is_empty() {
            return Ok(SegmentedParagraph::default());
        }

        let mut segments = Vec::new();
        for sentence in self.splitter.split_into_sentences(paragraph)? {
            segments.extend(
                split_and_insert_period(&sentence, self.config.max_length, self.config.long_words)
                    .into_iter()
                    .map(Segment::new),
            );
        }

        Ok(SegmentedParagraph { segments })
    }
}

/// Segment `text` with a one-off configuration.
pub fn segment<S: SentenceSplitter>(
    splitter: S,
    text: &str,
    max_length: usize,
) -> Result<SegmentedText> {
    let config = SegmenterConfig::new(max_length)?;
    Segmenter::new(splitter, config).segment(text)
}

/// Break a sentence into fragments of at most `max_length` characters, each
/// ending in terminal punctuation.
///
/// Cuts prefer the last comma inside the window, then the last space. The
/// fallback depends on `policy`. Every iteration consumes at least one
/// character, so the loop always terminates.
///
/// The period that may be appended counts toward the cap: an unterminated
/// sentence of exactly `max_length` characters is split rather than emitted
/// one character over.
pub fn split_and_insert_period(
    sentence: &str,
    max_length: usize,
    policy: LongWordPolicy,
) -> Vec<String> {
    let max_length = max_length.max(1);
    let mut fragments = Vec::new();
    let mut rest = sentence.trim();

    while !rest.is_empty() {
        let (head, tail) = if fits(rest, max_length) {
            (rest, "")
        } else {
            match find_cut(rest, max_length, policy) {
                Cut::Comma(at) => (&rest[..at], &rest[at + 1..]),
                Cut::At(at) => (&rest[..at], &rest[at..]),
                Cut::Whole => (rest, ""),
            }
        };

        let head = head.trim_end();
        let head = head.strip_suffix(',').unwrap_or(head).trim_end();
        if !head.is_empty() {
            fragments.push(ensure_terminal(head));
        }

        rest = tail.trim();
    }

    fragments
}

/// A fragment fits when it, plus the period it may need, is within the cap.
fn fits(text: &str, max_length: usize) -> bool {
    let pad = usize::from(!is_terminated(text));
    char_len(text) + pad <= max_length
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cut {
    /// Split on a comma at this byte offset; the comma is dropped.
    Comma(usize),
    /// Split at this byte offset; the tail starts here.
    At(usize),
    /// No split point; emit the remainder as-is.
    Whole,
}

fn find_cut(text: &str, max_length: usize, policy: LongWordPolicy) -> Cut {
    let window_end = byte_offset(text, max_length);
    let window = &text[..window_end];

    let comma = window.rfind(',');
    if let Some(at) = comma.filter(|&at| at > 0) {
        return Cut::Comma(at);
    }

    // Under HardCut a lone leading comma goes straight to the character cut
    let leading_comma = comma == Some(0);
    if !(leading_comma && policy == LongWordPolicy::HardCut) {
        if let Some(at) = window.rfind(char::is_whitespace).filter(|&at| at > 0) {
            return Cut::At(at);
        }
    }

    match policy {
        LongWordPolicy::HardCut => Cut::At(byte_offset(text, (max_length - 1).max(1))),
        LongWordPolicy::Keep => match text[window_end..].find(|c: char| c == ',' || c.is_whitespace()) {
            Some(offset) => {
                let at = window_end + offset;
                if text[at..].starts_with(',') {
                    Cut::Comma(at)
                } else {
                    Cut::At(at)
                }
            }
            None => Cut::Whole,
        },
    }
}

/// Byte offset of the `n`th character, or the end of `text`.
fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{PunctuationSplitter, TERMINATORS};
    use proptest::prelude::*;

    fn segmenter(max_length: usize) -> Segmenter<PunctuationSplitter> {
        Segmenter::new(PunctuationSplitter, SegmenterConfig::new(max_length).unwrap())
    }

    fn all_segments(text: &SegmentedText) -> Vec<String> {
        text.segments().map(|s| s.as_str().to_string()).collect()
    }

    fn letters_only(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_whitespace() && !TERMINATORS.contains(c) && *c != ',')
            .collect()
    }

    #[test]
    fn test_terminated_sentence_unchanged() {
        let out = segmenter(50).segment("Hello world.").unwrap();
        assert_eq!(all_segments(&out), vec!["Hello world."]);
    }

    #[test]
    fn test_period_appended() {
        let out = segmenter(50).segment("Hello world").unwrap();
        assert_eq!(all_segments(&out), vec!["Hello world."]);
    }

    #[test]
    fn test_question_mark_kept() {
        let out = segmenter(50).segment("Is it you? Yes").unwrap();
        assert_eq!(all_segments(&out), vec!["Is it you?", "Yes."]);
    }

    #[test]
    fn test_split_at_comma() {
        let first = format!("{},", "a ".repeat(60).trim_end());
        let second = "b ".repeat(90);
        let sentence = format!("{} {}", first, second.trim_end());
        assert!(char_len(&sentence) > 250);

        let out = segmenter(250).segment(&sentence).unwrap();
        let segments = all_segments(&out);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], format!("{}.", "a ".repeat(60).trim_end()));
        assert_eq!(segments[1], format!("{}.", "b ".repeat(90).trim_end()));
        assert!(segments.iter().all(|s| char_len(s) <= 250));
    }

    #[test]
    fn test_split_at_space_without_comma() {
        let sentence = "word ".repeat(70);
        let out = segmenter(100).segment(sentence.trim_end()).unwrap();
        let segments = all_segments(&out);
        assert!(segments.len() > 1);
        for segment in &segments {
            assert!(char_len(segment) <= 100, "too long: {}", segment);
            assert!(segment.ends_with('.'));
        }
        assert_eq!(letters_only(&segments.join(" ")), letters_only(&sentence));
    }

    #[test]
    fn test_long_word_kept_whole() {
        let word = "x".repeat(400);
        let out = segmenter(250).segment(&word).unwrap();
        let segments = all_segments(&out);
        assert_eq!(segments.len(), 1);
        assert_eq!(char_len(&segments[0]), 401);
        assert_eq!(segments[0], format!("{}.", word));
    }

    #[test]
    fn test_long_word_followed_by_words() {
        let text = format!("{} tail words here", "y".repeat(30));
        let parts = split_and_insert_period(&text, 10, LongWordPolicy::Keep);
        assert_eq!(parts[0], format!("{}.", "y".repeat(30)));
        assert_eq!(parts[1..], ["tail.", "words.", "here."]);
    }

    #[test]
    fn test_hard_cut_policy() {
        let parts = split_and_insert_period("abcdefghij", 4, LongWordPolicy::HardCut);
        assert_eq!(parts, vec!["abc.", "def.", "ghi.", "j."]);
        assert!(parts.iter().all(|p| char_len(p) <= 4));
    }

    #[test]
    fn test_hard_cut_with_tiny_max_length() {
        let parts = split_and_insert_period("abc", 1, LongWordPolicy::HardCut);
        assert_eq!(parts, vec!["a.", "b.", "c."]);
    }

    #[test]
    fn test_tiny_max_length_terminates() {
        let parts = split_and_insert_period("a b, c d", 1, LongWordPolicy::Keep);
        assert_eq!(parts, vec!["a.", "b.", "c.", "d."]);
    }

    #[test]
    fn test_trailing_comma_replaced() {
        let parts = split_and_insert_period("one two, three four five", 12, LongWordPolicy::Keep);
        assert_eq!(parts[0], "one two.");
        assert_eq!(parts.last().map(String::as_str), Some("five."));
    }

    #[test]
    fn test_trailing_comma_on_short_sentence() {
        let parts = split_and_insert_period("and so on,", 50, LongWordPolicy::Keep);
        assert_eq!(parts, vec!["and so on."]);
    }

    #[test]
    fn test_leading_comma_falls_back_to_space() {
        let parts = split_and_insert_period(",abc def ghi jkl", 8, LongWordPolicy::Keep);
        assert_eq!(parts[0], ",abc.");
        assert_eq!(parts[1..], ["def ghi.", "jkl."]);
    }

    #[test]
    fn test_leading_comma_hard_cut_skips_space_search() {
        let parts = split_and_insert_period(",abc def ghi jkl", 8, LongWordPolicy::HardCut);
        assert_eq!(parts, vec![",abc de.", "f ghi.", "jkl."]);
        assert!(parts.iter().all(|p| char_len(p) <= 8));
    }

    #[test]
    fn test_exact_fit_without_period_splits() {
        // 10 chars, no terminator: adding the period would exceed the cap.
        let parts = split_and_insert_period("abcd efghi", 10, LongWordPolicy::Keep);
        assert_eq!(parts, vec!["abcd.", "efghi."]);

        // One character shorter leaves room for the period
        let parts = split_and_insert_period("abcd efgh", 10, LongWordPolicy::Keep);
        assert_eq!(parts, vec!["abcd efgh."]);
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        let sentence = "ééééé ééééé ééééé";
        let parts = split_and_insert_period(sentence, 12, LongWordPolicy::Keep);
        assert_eq!(parts, vec!["ééééé ééééé.", "ééééé."]);
    }

    #[test]
    fn test_paragraphs_preserved() {
        let out = segmenter(50).segment("First paragraph.\nSecond paragraph").unwrap();
        assert_eq!(out.paragraph_count(), 2);
        assert_eq!(out.to_text(), "First paragraph.\nSecond paragraph.");
    }

    #[test]
    fn test_blank_lines_preserved() {
        let out = segmenter(50).segment("One.\n\n  \nTwo.").unwrap();
        assert_eq!(out.paragraph_count(), 4);
        assert!(out.paragraphs[1].is_empty());
        assert!(out.paragraphs[2].is_empty());
        assert_eq!(out.to_text(), "One.\n\n\nTwo.");
    }

    #[test]
    fn test_crlf_input() {
        let out = segmenter(50).segment("One\r\nTwo").unwrap();
        assert_eq!(out.to_text(), "One.\nTwo.");
    }

    #[test]
    fn test_empty_text() {
        let out = segmenter(50).segment("").unwrap();
        assert_eq!(out.paragraph_count(), 1);
        assert_eq!(out.segment_count(), 0);
        assert_eq!(out.to_text(), "");
    }

    #[test]
    fn test_whitespace_only_text() {
        let out = segmenter(50).segment("   \t ").unwrap();
        assert_eq!(out.segment_count(), 0);
    }

    #[test]
    fn test_zero_max_length_rejected() {
        assert_eq!(
            SegmenterConfig::new(0),
            Err(SegmentError::InvalidMaxLength(0))
        );
        assert_eq!(
            segment(PunctuationSplitter, "Hello.", 0),
            Err(SegmentError::InvalidMaxLength(0))
        );
    }

    #[test]
    fn test_segment_free_function() {
        let out = segment(PunctuationSplitter, "Hello world", 50).unwrap();
        assert_eq!(out.to_text(), "Hello world.");
    }

    #[test]
    fn test_segment_with_seams() {
        let out = segment(crate::text::SeamsSplitter, "Hello world. Goodbye world", 50).unwrap();
        assert_eq!(out.paragraph_count(), 1);
        assert!(out.segments().all(|s| s.as_str().ends_with('.')));
    }

    fn paragraph_text() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                "[a-z]{1,12}",
                "[a-z]{1,8},",
                "[a-z]{1,8}[.!?]",
                "[a-z]{20,60}",
            ],
            0..40,
        )
        .prop_map(|words| words.join(" "))
    }

    fn book_text() -> impl Strategy<Value = String> {
        prop::collection::vec(paragraph_text(), 1..6).prop_map(|p| p.join("\n"))
    }

    proptest! {
        #[test]
        fn prop_segments_bounded_or_unsplittable(text in book_text(), max_length in 1usize..80) {
            let out = segmenter(max_length).segment(&text).unwrap();
            for segment in out.segments() {
                let s = segment.as_str();
                if segment.char_len() > max_length {
                    let window: String = s.chars().take(max_length).collect();
                    prop_assert!(
                        !window.contains(char::is_whitespace)
                            && !window.chars().skip(1).any(|c| c == ','),
                        "splittable over-length segment {:?}", s
                    );
                }
            }
        }

        #[test]
        fn prop_segments_terminated(text in book_text(), max_length in 1usize..80) {
            let out = segmenter(max_length).segment(&text).unwrap();
            for segment in out.segments() {
                prop_assert!(is_terminated(segment.as_str()), "unterminated {:?}", segment);
            }
        }

        #[test]
        fn prop_paragraph_count_preserved(text in book_text(), max_length in 1usize..80) {
            let out = segmenter(max_length).segment(&text).unwrap();
            prop_assert_eq!(out.paragraph_count(), text.split('\n').count());
            prop_assert_eq!(out.to_text().split('\n').count(), text.split('\n').count());
        }

        #[test]
        fn prop_no_content_loss(text in book_text(), max_length in 1usize..80) {
            let out = segmenter(max_length).segment(&text).unwrap();
            prop_assert_eq!(letters_only(&out.to_text()), letters_only(&text));
        }

        #[test]
        fn prop_resegmenting_keeps_content(text in book_text(), max_length in 1usize..80) {
            let s = segmenter(max_length);
            let once = s.segment(&text).unwrap().to_text();
            let twice = s.segment(&once).unwrap().to_text();
            prop_assert_eq!(letters_only(&twice), letters_only(&once));
        }
    }
}
