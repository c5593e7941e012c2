//! Book and chapter model handed from segmentation to synthesis and packaging.

use crate::error::BookError;
use crate::text::{Segment, SegmentedText};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A titled chapter with its normalized body and eventual audio file.
#[derive(Debug, Clone, Serialize)]
pub struct Chapter {
    title: String,
    body: String,
    audio_path: Option<PathBuf>,
    #[serde(skip)]
    segmented: SegmentedText,
}

impl Chapter {
    pub(crate) fn new(title: String, segmented: SegmentedText) -> Self {
        Self {
            title,
            body: segmented.to_text(),
            audio_path: None,
            segmented,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Normalized body: segments space-joined per paragraph, paragraphs newline-joined.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn audio_path(&self) -> Option<&Path> {
        self.audio_path.as_deref()
    }

    pub fn segmented(&self) -> &SegmentedText {
        &self.segmented
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segmented.segments()
    }

    /// True when there is nothing to synthesize.
    pub fn is_empty(&self) -> bool {
        self.segmented.segment_count() == 0
    }
}

/// An assembled book. Only chapter audio paths change after assembly.
#[derive(Debug, Clone, Serialize)]
pub struct Book {
    title: String,
    author: String,
    chapters: Vec<Chapter>,
}

impl Book {
    pub(crate) fn new(title: String, author: String, chapters: Vec<Chapter>) -> Self {
        Self {
            title,
            author,
            chapters,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Total segment count across chapters.
    pub fn total_segments(&self) -> usize {
        self.chapters
            .iter()
            .map(|c| c.segmented.segment_count())
            .sum()
    }

    /// Approximate word count across chapters.
    pub fn total_words(&self) -> usize {
        self.chapters
            .iter()
            .map(|c| c.body.split_whitespace().count())
            .sum()
    }

    /// Record the synthesized audio for a chapter. Each chapter accepts one path.
    pub fn assign_audio_path(
        &mut self,
        index: usize,
        path: impl Into<PathBuf>,
    ) -> Result<(), BookError> {
        let chapter = self
            .chapters
            .get_mut(index)
            .ok_or(BookError::ChapterOutOfRange(index))?;

        if let Some(existing) = &chapter.audio_path {
            return Err(BookError::AudioPathAlreadySet {
                index,
                title: chapter.title.clone(),
                existing: existing.display().to_string(),
            });
        }

        chapter.audio_path = Some(path.into());
        Ok(())
    }

    /// Flat text for the whole book, chapters separated by a blank line.
    pub fn to_text(&self) -> String {
        self.chapters
            .iter()
            .map(|c| format!("# {}\n{}", c.title, c.body))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
