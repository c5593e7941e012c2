//! Chapter assembly: raw extracted chapters in, segmented [`Book`] out.

use crate::book::{Book, Chapter};
use crate::error::SegmentError;
use crate::text::{clean_text, Segmenter, SegmentedText, SentenceSplitter};
use log::{debug, warn};
use rayon::prelude::*;

/// A chapter as produced by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChapter {
    pub title: String,
    /// Plain text, one block element per line
    pub body: String,
}

impl RawChapter {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// A chapter whose segmentation failed. The chapter itself is kept with an empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterFailure {
    pub index: usize,
    pub title: String,
    pub error: SegmentError,
}

/// Result of assembling a book.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub book: Book,
    pub failures: Vec<ChapterFailure>,
}

/// Groups segmented chapter text into a [`Book`].
pub struct ChapterAssembler<S> {
    segmenter: Segmenter<S>,
    normalize: bool,
}

impl<S: SentenceSplitter> ChapterAssembler<S> {
    pub fn new(segmenter: Segmenter<S>) -> Self {
        Self {
            segmenter,
            normalize: true,
        }
    }

    /// Toggle character cleanup before segmentation (on by default).
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Segment every chapter and build the book.
    ///
    /// Chapters are processed in parallel; the output keeps the input order.
    /// A chapter that fails to segment does not affect its siblings.
    pub fn assemble(
        &self,
        title: impl Into<String>,
        author: impl Into<String>,
        raw_chapters: Vec<RawChapter>,
    ) -> Assembly {
        let results: Vec<(Chapter, Option<ChapterFailure>)> = raw_chapters
            .into_par_iter()
            .enumerate()
            .map(|(index, raw)| self.assemble_chapter(index, raw))
            .collect();

        let mut chapters = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (chapter, failure) in results {
            chapters.push(chapter);
            failures.extend(failure);
        }

        Assembly {
            book: Book::new(title.into(), author.into(), chapters),
            failures,
        }
    }

    fn assemble_chapter(&self, index: usize, raw: RawChapter) -> (Chapter, Option<ChapterFailure>) {
        let body = if self.normalize {
            clean_text(&raw.body)
        } else {
            raw.body
        };

        match self.segmenter.segment(body.trim_matches('\n')) {
            Ok(segmented) => {
                debug!(
                    "Chapter {} \"{}\": {} paragraphs, {} segments",
                    index,
                    raw.title,
                    segmented.paragraph_count(),
                    segmented.segment_count()
                );
                (Chapter::new(raw.title, segmented), None)
            }
            Err(error) => {
                warn!("Chapter {} \"{}\" failed to segment: {}", index, raw.title, error);
                let failure = ChapterFailure {
                    index,
                    title: raw.title.clone(),
                    error,
                };
                (Chapter::new(raw.title, SegmentedText::default()), Some(failure))
            }
        }
    }
}
