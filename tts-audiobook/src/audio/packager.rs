//! M4B packaging of narrated chapters.

use super::ffmpeg::Ffmpeg;
use super::metadata::{build_chapter_info, create_ffmpeg_metadata};
use crate::book::Book;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Package every chapter that has audio into a single M4B with one marker per chapter.
///
/// Chapters without audio are left out. Fails when no chapter has audio.
pub fn package_m4b(
    ffmpeg: &Ffmpeg,
    book: &Book,
    output_path: &Path,
    cover_image: Option<&Path>,
) -> Result<()> {
    let narrated: Vec<(&str, &Path)> = book
        .chapters()
        .iter()
        .filter_map(|c| c.audio_path().map(|path| (c.title(), path)))
        .collect();

    if narrated.is_empty() {
        anyhow::bail!("No chapters have audio to package");
    }

    let mut durations = Vec::with_capacity(narrated.len());
    for (title, path) in &narrated {
        let duration_ms = ffmpeg.audio_duration_ms(path)?;
        debug!("\"{}\": {} ms", title, duration_ms);
        durations.push((title.to_string(), duration_ms));
    }
    let chapters = build_chapter_info(&durations);

    let temp_dir = TempDir::new()?;

    let audio_files: Vec<&Path> = narrated.iter().map(|(_, path)| *path).collect();
    let all_audio = temp_dir.path().join("all_audio.wav");
    ffmpeg.concatenate(&audio_files, &all_audio)?;

    let metadata_file = temp_dir.path().join("metadata.txt");
    create_ffmpeg_metadata(book.title(), book.author(), &chapters, &metadata_file)?;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cmd = ffmpeg.ffmpeg_command();
    cmd.args(["-y", "-i"])
        .arg(&all_audio)
        .arg("-i")
        .arg(&metadata_file);

    match cover_image.filter(|cover| cover.exists()) {
        Some(cover) => {
            cmd.arg("-i").arg(cover).args([
                "-map",
                "0:a",
                "-map",
                "2:v",
                "-c:v",
                "copy",
                "-disposition:v:0",
                "attached_pic",
            ]);
        }
        None => {
            cmd.args(["-map", "0:a"]);
        }
    }

    cmd.args([
        "-map_metadata",
        "1",
        "-c:a",
        "aac",
        "-b:a",
        "128k",
        "-f",
        "mp4",
    ])
    .arg(output_path);

    let output = cmd.output().context("Failed to run ffmpeg M4B creation")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffmpeg M4B creation failed: {}", stderr);
    }

    info!(
        "Packaged {} chapters into {}",
        chapters.len(),
        output_path.display()
    );
    Ok(())
}

/// Write embedded cover bytes into `dir`, named after the detected image format.
pub fn write_cover_image(bytes: &[u8], dir: &Path) -> Result<PathBuf> {
    let path = dir.join(cover_filename(bytes));
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write cover to {}", path.display()))?;
    Ok(path)
}

fn cover_filename(data: &[u8]) -> &'static str {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "cover.jpg"
    } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "cover.png"
    } else if data.starts_with(b"GIF") {
        "cover.gif"
    } else if data.starts_with(b"RIFF") && data.len() > 12 && &data[8..12] == b"WEBP" {
        "cover.webp"
    } else {
        "cover.jpg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{ChapterAssembler, RawChapter};
    use crate::text::{PunctuationSplitter, Segmenter, SegmenterConfig};

    fn book() -> Book {
        ChapterAssembler::new(Segmenter::new(
            PunctuationSplitter,
            SegmenterConfig::default(),
        ))
        .assemble("T", "A", vec![RawChapter::new("One", "Hello.")])
        .book
    }

    #[test]
    fn test_cover_filename() {
        assert_eq!(cover_filename(&[0xFF, 0xD8, 0xFF, 0xE0]), "cover.jpg");
        assert_eq!(cover_filename(&[0x89, 0x50, 0x4E, 0x47, 0x0D]), "cover.png");
        assert_eq!(cover_filename(b"GIF89a"), "cover.gif");
        assert_eq!(cover_filename(b"RIFF\0\0\0\0WEBPVP8 "), "cover.webp");
        assert_eq!(cover_filename(b"????"), "cover.jpg");
    }

    #[test]
    fn test_write_cover_image() {
        let dir = TempDir::new().unwrap();
        let path = write_cover_image(&[0x89, 0x50, 0x4E, 0x47], dir.path()).unwrap();
        assert_eq!(path, dir.path().join("cover.png"));
        assert_eq!(std::fs::read(&path).unwrap().len(), 4);
    }

    #[test]
    fn test_package_without_audio_fails() {
        let dir = TempDir::new().unwrap();
        let err = package_m4b(&Ffmpeg::default(), &book(), &dir.path().join("b.m4b"), None)
            .unwrap_err();
        assert!(err.to_string().contains("No chapters have audio"));
    }
}
