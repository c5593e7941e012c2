//! Narration: synthesize each chapter's segments and join them into one file per chapter.

use crate::audio::Ffmpeg;
use crate::book::Book;
use crate::tts::{TtsBackend, TtsOptions};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MAX_TITLE_CHARS: usize = 80;

/// File name for a chapter's audio, e.g. `003 - The Storm.wav`.
pub fn chapter_file_name(index: usize, title: &str) -> String {
    let name: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_TITLE_CHARS)
        .collect();
    let name = name.trim();
    let name = if name.is_empty() { "Chapter" } else { name };

    format!("{:03} - {}.wav", index + 1, name)
}

/// Attach chapter files left in `book_dir` by an earlier run. Returns how many were found.
pub fn attach_existing_audio(book: &mut Book, book_dir: &Path) -> usize {
    let found: Vec<(usize, PathBuf)> = book
        .chapters()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.audio_path().is_none())
        .map(|(i, c)| (i, book_dir.join(chapter_file_name(i, c.title()))))
        .filter(|(_, path)| path.is_file())
        .collect();

    let mut attached = 0;
    for (index, path) in found {
        info!("Found existing audio for chapter {}: {}", index, path.display());
        if book.assign_audio_path(index, path).is_ok() {
            attached += 1;
        }
    }
    attached
}

/// Outcome of a narration run, by chapter index.
#[derive(Debug, Default)]
pub struct NarrationReport {
    pub completed: Vec<usize>,
    pub skipped: Vec<usize>,
    pub failed: Vec<(usize, String)>,
}

/// Drives a [`TtsBackend`] over the chapters of a [`Book`].
pub struct Narrator<B> {
    backend: B,
    ffmpeg: Ffmpeg,
    options: TtsOptions,
    max_retries: u32,
    book_dir: PathBuf,
}

impl<B: TtsBackend> Narrator<B> {
    pub fn new(backend: B, ffmpeg: Ffmpeg, book_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            ffmpeg,
            options: TtsOptions::default(),
            max_retries: 3,
            book_dir: book_dir.into(),
        }
    }

    pub fn with_options(mut self, options: TtsOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Narrate chapters in `range`. Chapters that already have audio, or have
    /// nothing to say, are skipped. A failed chapter is reported and the run
    /// moves on.
    pub async fn narrate(&self, book: &mut Book, range: Range<usize>) -> Result<NarrationReport> {
        std::fs::create_dir_all(&self.book_dir)
            .with_context(|| format!("Failed to create {}", self.book_dir.display()))?;

        let end = range.end.min(book.chapters().len());
        let start = range.start.min(end);
        let mut report = NarrationReport::default();

        let pending: Vec<usize> = (start..end)
            .filter(|&i| {
                let chapter = &book.chapters()[i];
                let skip = chapter.audio_path().is_some() || chapter.is_empty();
                if skip {
                    report.skipped.push(i);
                }
                !skip
            })
            .collect();

        let total: usize = pending
            .iter()
            .map(|&i| book.chapters()[i].segments().count())
            .sum();
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("#>-"),
        );

        for index in pending {
            let chapter = &book.chapters()[index];
            let title = chapter.title().to_string();
            let segments: Vec<String> = chapter.segments().map(|s| s.as_str().to_string()).collect();
            pb.set_message(title.clone());

            match self.narrate_chapter(index, &title, &segments, &pb).await {
                Ok(path) => {
                    book.assign_audio_path(index, path)?;
                    report.completed.push(index);
                }
                Err(e) => {
                    warn!("Chapter {} \"{}\" failed: {:#}", index, title, e);
                    report.failed.push((index, format!("{:#}", e)));
                }
            }
        }

        pb.finish_with_message("Narration complete");
        Ok(report)
    }

    async fn narrate_chapter(
        &self,
        index: usize,
        title: &str,
        segments: &[String],
        pb: &ProgressBar,
    ) -> Result<PathBuf> {
        // Scratch lives in book_dir so the finished file can be renamed into place
        let scratch = TempDir::new_in(&self.book_dir)?;
        let mut parts = Vec::with_capacity(segments.len());

        for (i, text) in segments.iter().enumerate() {
            let part = scratch.path().join(format!("part_{:05}.wav", i));
            self.backend
                .synthesize_with_retry(text, &part, &self.options, self.max_retries)
                .await
                .with_context(|| format!("Segment {} of \"{}\"", i, title))?;
            parts.push(part);
            pb.inc(1);
        }

        let joined = scratch.path().join("chapter.wav");
        let ffmpeg = self.ffmpeg.clone();
        let output = joined.clone();
        tokio::task::spawn_blocking(move || {
            let part_refs: Vec<&Path> = parts.iter().map(PathBuf::as_path).collect();
            ffmpeg.concatenate(&part_refs, &output)
        })
        .await
        .context("Concatenation task panicked")??;

        // Only a complete file may appear under the name resume looks for
        let target = self.book_dir.join(chapter_file_name(index, title));
        std::fs::rename(&joined, &target)
            .with_context(|| format!("Failed to move audio to {}", target.display()))?;

        debug!("Chapter {} written to {}", index, target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{ChapterAssembler, RawChapter};
    use crate::text::{PunctuationSplitter, Segmenter, SegmenterConfig};
    use async_trait::async_trait;

    fn book(chapters: &[(&str, &str)]) -> Book {
        let raw = chapters
            .iter()
            .map(|(title, body)| RawChapter::new(*title, *body))
            .collect();
        ChapterAssembler::new(Segmenter::new(
            PunctuationSplitter,
            SegmenterConfig::default(),
        ))
        .assemble("T", "A", raw)
        .book
    }

    /// Writes the text itself as the "audio"; fails on text containing "FAIL".
    struct TextBackend;

    #[async_trait]
    impl TtsBackend for TextBackend {
        async fn synthesize(&self, text: &str, output: &Path, _options: &TtsOptions) -> Result<()> {
            if text.contains("FAIL") {
                anyhow::bail!("cannot say that");
            }
            std::fs::write(output, text)?;
            Ok(())
        }

        fn name(&self) -> &str {
            "text"
        }
    }

    #[test]
    fn test_chapter_file_name() {
        assert_eq!(chapter_file_name(0, "Prologue"), "001 - Prologue.wav");
        assert_eq!(chapter_file_name(11, "What? A/B"), "012 - What_ A_B.wav");
        assert_eq!(chapter_file_name(2, "   "), "003 - Chapter.wav");
        let long = "x".repeat(200);
        assert_eq!(chapter_file_name(0, &long).len(), "001 - .wav".len() + 80);
    }

    #[tokio::test]
    async fn test_narrate_assigns_paths_and_skips_empty() {
        let dir = TempDir::new().unwrap();
        let mut book = book(&[("Cover", ""), ("One", "Hello there."), ("Two", "Bye now.")]);

        let report = Narrator::new(TextBackend, Ffmpeg::default(), dir.path())
            .narrate(&mut book, 0..10)
            .await
            .unwrap();

        assert_eq!(report.completed, vec![1, 2]);
        assert_eq!(report.skipped, vec![0]);
        assert!(report.failed.is_empty());

        let path = book.chapters()[1].audio_path().unwrap();
        assert_eq!(path, dir.path().join("002 - One.wav"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Hello there.");
        assert!(book.chapters()[0].audio_path().is_none());
    }

    #[tokio::test]
    async fn test_narrate_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let mut book = book(&[("Bad", "Please FAIL."), ("Good", "Fine.")]);

        let report = Narrator::new(TextBackend, Ffmpeg::default(), dir.path())
            .with_max_retries(1)
            .narrate(&mut book, 0..2)
            .await
            .unwrap();

        assert_eq!(report.completed, vec![1]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 0);
        assert!(report.failed[0].1.contains("cannot say that"));
        assert!(book.chapters()[0].audio_path().is_none());
    }

    #[tokio::test]
    async fn test_narrate_respects_range() {
        let dir = TempDir::new().unwrap();
        let mut book = book(&[("One", "A."), ("Two", "B."), ("Three", "C.")]);

        let report = Narrator::new(TextBackend, Ffmpeg::default(), dir.path())
            .narrate(&mut book, 1..2)
            .await
            .unwrap();

        assert_eq!(report.completed, vec![1]);
        assert!(book.chapters()[0].audio_path().is_none());
        assert!(book.chapters()[2].audio_path().is_none());
    }

    #[tokio::test]
    async fn test_resume_attaches_existing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("001 - One.wav"), "old").unwrap();
        let mut book = book(&[("One", "A."), ("Two", "B.")]);

        assert_eq!(attach_existing_audio(&mut book, dir.path()), 1);
        assert_eq!(
            book.chapters()[0].audio_path(),
            Some(dir.path().join("001 - One.wav").as_path())
        );

        let report = Narrator::new(TextBackend, Ffmpeg::default(), dir.path())
            .narrate(&mut book, 0..2)
            .await
            .unwrap();
        assert_eq!(report.skipped, vec![0]);
        assert_eq!(report.completed, vec![1]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("001 - One.wav")).unwrap(),
            "old"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_concat_leaves_no_chapter_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let script = dir.path().join("broken-ffmpeg.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\nfor last; do :; done\necho partial > \"$last\"\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let book_dir = dir.path().join("book");
        let mut first_run = book(&[("One", "First part. Second part.")]);
        assert_eq!(first_run.chapters()[0].segments().count(), 2);

        let ffmpeg = Ffmpeg::new(script.to_string_lossy(), "ffprobe");
        let report = Narrator::new(TextBackend, ffmpeg, &book_dir)
            .narrate(&mut first_run, 0..1)
            .await
            .unwrap();

        assert!(report.completed.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert!(!book_dir.join("001 - One.wav").exists());

        let mut fresh = book(&[("One", "First part. Second part.")]);
        assert_eq!(attach_existing_audio(&mut fresh, &book_dir), 0);
        assert!(fresh.chapters()[0].audio_path().is_none());
    }
}
