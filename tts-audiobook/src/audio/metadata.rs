//! FFmpeg metadata generation for M4B chapter markers.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A chapter marker in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterInfo {
    pub title: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Lay chapters end to end from their durations.
pub fn build_chapter_info(chapters: &[(String, u64)]) -> Vec<ChapterInfo> {
    let mut start_ms = 0;

    chapters
        .iter()
        .map(|(title, duration_ms)| {
            let info = ChapterInfo {
                title: title.clone(),
                start_ms,
                end_ms: start_ms + duration_ms,
            };
            start_ms = info.end_ms;
            info
        })
        .collect()
}

/// Write an `;FFMETADATA1` file with book tags and chapter markers.
pub fn create_ffmpeg_metadata(
    title: &str,
    author: &str,
    chapters: &[ChapterInfo],
    output_path: &Path,
) -> Result<()> {
    let mut file = File::create(output_path).context("Failed to create metadata file")?;
    file.write_all(render_ffmpeg_metadata(title, author, chapters).as_bytes())?;
    Ok(())
}

fn render_ffmpeg_metadata(title: &str, author: &str, chapters: &[ChapterInfo]) -> String {
    let mut out = String::from(";FFMETADATA1\n");
    out.push_str(&format!("title={}\n", escape_metadata_value(title)));
    out.push_str(&format!("artist={}\n", escape_metadata_value(author)));
    out.push_str(&format!("album={}\n", escape_metadata_value(title)));
    out.push_str("genre=Audiobook\n\n");

    for chapter in chapters {
        out.push_str("[CHAPTER]\nTIMEBASE=1/1000\n");
        out.push_str(&format!("START={}\nEND={}\n", chapter.start_ms, chapter.end_ms));
        out.push_str(&format!("title={}\n\n", escape_metadata_value(&chapter.title)));
    }

    out
}

/// FFmpeg metadata values escape `= ; # \` and newlines.
fn escape_metadata_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '=' | ';' | '#' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }

    escaped
}
