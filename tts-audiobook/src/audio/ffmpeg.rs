//! Thin wrappers around the ffmpeg and ffprobe executables.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Names (or paths) of the FFmpeg executables.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl Ffmpeg {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub(crate) fn ffmpeg_command(&self) -> Command {
        Command::new(&self.ffmpeg)
    }

    /// Check that ffmpeg runs.
    pub fn is_available(&self) -> bool {
        self.ffmpeg_command()
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Duration of an audio file in milliseconds.
    pub fn audio_duration_ms(&self, audio_path: &Path) -> Result<u64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "quiet",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(audio_path)
            .output()
            .with_context(|| format!("Failed to run {}", self.ffprobe))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffprobe failed on {}: {}", audio_path.display(), stderr);
        }

        parse_duration_ms(&String::from_utf8_lossy(&output.stdout))
    }

    /// Concatenate same-format audio files with the concat demuxer.
    pub fn concatenate(&self, audio_files: &[&Path], output_path: &Path) -> Result<()> {
        match audio_files {
            [] => anyhow::bail!("No audio files provided"),
            [single] => {
                std::fs::copy(single, output_path).with_context(|| {
                    format!("Failed to copy {} to {}", single.display(), output_path.display())
                })?;
                return Ok(());
            }
            _ => {}
        }

        let temp_dir = TempDir::new()?;
        let list_file = temp_dir.path().join("concat_list.txt");
        std::fs::write(&list_file, concat_list(audio_files))?;

        debug!(
            "Concatenating {} files into {}",
            audio_files.len(),
            output_path.display()
        );
        let output = self
            .ffmpeg_command()
            .args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list_file)
            .args(["-c", "copy"])
            .arg(output_path)
            .output()
            .context("Failed to run ffmpeg concat")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg concat failed: {}", stderr);
        }

        Ok(())
    }
}

fn parse_duration_ms(stdout: &str) -> Result<u64> {
    let secs: f64 = stdout
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse duration '{}'", stdout.trim()))?;
    Ok((secs * 1000.0).round() as u64)
}

/// Concat demuxer list; single quotes in paths are escaped.
fn concat_list(audio_files: &[&Path]) -> String {
    audio_files
        .iter()
        .map(|path| {
            let path = path.to_string_lossy().replace('\'', "'\\''");
            format!("file '{}'\n", path)
        })
        .collect()
}
