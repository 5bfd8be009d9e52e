// NEWSREEL Encoder
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Every external media process goes through the `Encoder` trait so the
// assembler and the analyzer can be driven by a scripted encoder in tests.

use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::{NewsreelError, Result};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const STDERR_TAIL_LINES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderStage {
    Probe,
    Mux,
    Subtitles,
    SoundEffects,
}

impl EncoderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::Mux => "mux",
            Self::Subtitles => "subtitles",
            Self::SoundEffects => "sound-effects",
        }
    }
}

impl fmt::Display for EncoderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Encoder: Send + Sync {
    /// Runs one encoder invocation. `args` excludes the program name.
    async fn run(&self, stage: EncoderStage, args: Vec<OsString>) -> Result<()>;

    /// Media duration in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;
}

/// `ffmpeg` / `ffprobe` on the PATH (or configured names).
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.ffmpeg_bin.clone(), config.ffprobe_bin.clone())
    }

    /// True when `ffmpeg -version` runs successfully.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn run(&self, stage: EncoderStage, args: Vec<OsString>) -> Result<()> {
        debug!("[ENCODER] {} {}: {:?}", stage, self.ffmpeg, args);

        let output = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| NewsreelError::Encoder {
                stage,
                status: "spawn".to_string(),
                message: format!("could not start {}: {}", self.ffmpeg, e),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let status = output
            .status
            .code()
            .map(|c| format!("exit code {}", c))
            .unwrap_or_else(|| "terminated by signal".to_string());
        let message = stderr_tail(&output.stderr, STDERR_TAIL_LINES);
        warn!("[ENCODER] {} stage failed ({}):\n{}", stage, status, message);
        Err(NewsreelError::Encoder { stage, status, message })
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = tokio::time::timeout(
            PROBE_TIMEOUT,
            Command::new(&self.ffprobe)
                .kill_on_drop(true)
                .args([
                    "-v",
                    "error",
                    "-show_entries",
                    "format=duration",
                    "-of",
                    "default=noprint_wrappers=1:nokey=1",
                ])
                .arg(safe_arg_path(path))
                .output(),
        )
        .await
        .map_err(|_| NewsreelError::Encoder {
            stage: EncoderStage::Probe,
            status: "timeout".to_string(),
            message: format!("ffprobe did not answer within {}s", PROBE_TIMEOUT.as_secs()),
        })?
        .map_err(|e| NewsreelError::Encoder {
            stage: EncoderStage::Probe,
            status: "spawn".to_string(),
            message: format!("could not start {}: {}", self.ffprobe, e),
        })?;

        if !output.status.success() {
            return Err(NewsreelError::Encoder {
                stage: EncoderStage::Probe,
                status: format!("{}", output.status),
                message: stderr_tail(&output.stderr, STDERR_TAIL_LINES),
            });
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

pub fn parse_probe_output(stdout: &str) -> Result<f64> {
    let text = stdout.trim();
    text.parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| NewsreelError::Encoder {
            stage: EncoderStage::Probe,
            status: "unparseable".to_string(),
            message: format!("unexpected ffprobe output {:?}", text),
        })
}

/// Keeps a relative path starting with '-' from being read as an option.
pub fn safe_arg_path(path: &Path) -> PathBuf {
    if path.is_relative() && path.as_os_str().to_string_lossy().starts_with('-') {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

fn stderr_tail(stderr: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
