//! TTS backend that shells out to an external synthesis program.
//!
//! The program is configured as a command line with placeholders. Text goes to
//! stdin unless an argument contains `{text}`.

use super::{TtsBackend, TtsOptions};
use crate::config::TtsCommandConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const TEXT: &str = "{text}";
const OUTPUT: &str = "{output}";
const VOICE: &str = "{voice}";
const LANGUAGE: &str = "{language}";

/// Runs `program args..` once per text unit.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &TtsCommandConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn reads_stdin(&self) -> bool {
        !self.args.iter().any(|a| a.contains(TEXT))
    }

    fn render_args(&self, text: &str, output_path: &Path, options: &TtsOptions) -> Vec<String> {
        let output = output_path.to_string_lossy();
        let voice = options
            .voice_ref
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        self.args
            .iter()
            .map(|arg| {
                arg.replace(OUTPUT, &output)
                    .replace(VOICE, &voice)
                    .replace(LANGUAGE, &options.language)
                    .replace(TEXT, text)
            })
            .collect()
    }
}

#[async_trait]
impl TtsBackend for CommandBackend {
    async fn synthesize(&self, text: &str, output_path: &Path, options: &TtsOptions) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.render_args(text, output_path, options);
        debug!("Running {} {:?}", self.program, args);

        let stdin = if self.reads_stdin() {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(stdin)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start TTS program '{}'", self.program))?;

        if let Some(mut pipe) = child.stdin.take() {
            let payload = format!("{}\n", text);
            // A program that exits without reading stdin is judged by its exit status
            if let Err(e) = pipe.write_all(payload.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e).context("Failed to write text to TTS program");
                }
            }
            // Dropping closes stdin so the program sees EOF
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for TTS program")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} exited with {}: {}", self.program, output.status, stderr.trim());
        }

        if !tokio::fs::try_exists(output_path).await.unwrap_or(false) {
            anyhow::bail!(
                "{} did not produce {}",
                self.program,
                output_path.display()
            );
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}
