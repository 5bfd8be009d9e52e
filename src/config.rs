// NEWSREEL Pipeline Configuration
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Output geometry, quality, storage layout and encoder binaries.
// Values come from a JSON file or NEWSREEL_* environment variables.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{NewsreelError, Result};

/// H.264 constant rate factor presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoQuality {
    High,
    Medium,
    Low,
    Crf(u8),
}

impl VideoQuality {
    pub fn crf(&self) -> u8 {
        match self {
            Self::High => 18,
            Self::Medium => 23,
            Self::Low => 28,
            Self::Crf(value) => (*value).min(51),
        }
    }
}

impl FromStr for VideoQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => other
                .parse::<u8>()
                .map(Self::Crf)
                .map_err(|_| format!("unknown video quality '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub quality: VideoQuality,
    /// Audio at or below this many seconds is rendered as a short.
    pub short_format_threshold: f64,
    pub storage_root: PathBuf,
    pub asset_root: PathBuf,
    pub frame_library_dir: PathBuf,
    pub fine_rotation_lattice: bool,
    pub frame_retention_hours: u64,
    pub public_url_base: String,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            frame_rate: 30,
            quality: VideoQuality::Medium,
            short_format_threshold: 15.0,
            storage_root: PathBuf::from("storage"),
            asset_root: PathBuf::from("assets"),
            frame_library_dir: PathBuf::from("temp/frame_library"),
            fine_rotation_lattice: false,
            frame_retention_hours: 24,
            public_url_base: "/videos".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file, falling back to the environment.
    pub fn load(path: &Path) -> Self {
        if let Ok(content) = fs::read_to_string(path) {
            match serde_json::from_str::<PipelineConfig>(&content) {
                Ok(config) => {
                    info!("[CONFIG] Loaded pipeline config from {:?}", path);
                    return config.sanitized();
                }
                Err(e) => warn!("[CONFIG] Ignoring malformed {:?}: {}", path, e),
            }
        }
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.width = env_or("NEWSREEL_VIDEO_WIDTH", config.width);
        config.height = env_or("NEWSREEL_VIDEO_HEIGHT", config.height);
        config.frame_rate = env_or("NEWSREEL_VIDEO_FPS", config.frame_rate);
        config.quality = env_or("NEWSREEL_VIDEO_QUALITY", config.quality);
        config.short_format_threshold =
            env_or("NEWSREEL_SHORT_FORMAT_THRESHOLD", config.short_format_threshold);
        config.fine_rotation_lattice = env_or("NEWSREEL_FINE_ROTATION", config.fine_rotation_lattice);
        config.frame_retention_hours =
            env_or("NEWSREEL_FRAME_RETENTION_HOURS", config.frame_retention_hours);

        if let Ok(root) = std::env::var("NEWSREEL_STORAGE_ROOT") {
            config.storage_root = PathBuf::from(root);
        }
        if let Ok(root) = std::env::var("NEWSREEL_ASSET_ROOT") {
            config.asset_root = PathBuf::from(root);
        }
        if let Ok(dir) = std::env::var("NEWSREEL_FRAME_LIBRARY_DIR") {
            config.frame_library_dir = PathBuf::from(dir);
        }
        if let Ok(base) = std::env::var("NEWSREEL_PUBLIC_URL_BASE") {
            config.public_url_base = base;
        }
        if let Ok(bin) = std::env::var("NEWSREEL_FFMPEG") {
            config.ffmpeg_bin = bin;
        }
        if let Ok(bin) = std::env::var("NEWSREEL_FFPROBE") {
            config.ffprobe_bin = bin;
        }

        config.sanitized()
    }

    fn sanitized(mut self) -> Self {
        if self.frame_rate == 0 {
            warn!("[CONFIG] Frame rate 0 is invalid, using 30");
            self.frame_rate = 30;
        }
        self
    }

    /// Rejects geometry that ffmpeg's yuv420p output cannot encode.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(NewsreelError::Configuration(format!(
                "output size {}x{} has a zero dimension",
                self.width, self.height
            )));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(NewsreelError::Configuration(format!(
                "output size {}x{} must be even for yuv420p",
                self.width, self.height
            )));
        }
        if self.frame_rate == 0 {
            return Err(NewsreelError::Configuration("frame rate must be positive".to_string()));
        }
        Ok(())
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.storage_root.join("frames")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.storage_root.join("videos")
    }

    pub fn subtitles_dir(&self) -> PathBuf {
        self.storage_root.join("subtitles")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.storage_root.join("images")
    }

    pub fn frame_retention(&self) -> Duration {
        Duration::from_secs(self.frame_retention_hours * 3600)
    }

    pub fn is_short_format(&self, duration: f64) -> bool {
        duration <= self.short_format_threshold
    }

    /// Public URL for a finished file.
    pub fn public_url(&self, path: &Path) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        format!("{}/{}", self.public_url_base.trim_end_matches('/'), name)
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("[CONFIG] {}='{}' is not valid, keeping default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_parsing() {
        assert_eq!("high".parse::<VideoQuality>().unwrap().crf(), 18);
        assert_eq!("Medium".parse::<VideoQuality>().unwrap().crf(), 23);
        assert_eq!("30".parse::<VideoQuality>().unwrap().crf(), 30);
        assert!("ultra".parse::<VideoQuality>().is_err());
    }

    #[test]
    fn test_short_format_threshold_is_inclusive() {
        let config = PipelineConfig::default();
        assert!(config.is_short_format(15.0));
        assert!(!config.is_short_format(15.01));
    }

    #[test]
    fn test_public_url() {
        let config = PipelineConfig {
            public_url_base: "https://cdn.example.com/videos/".to_string(),
            ..PipelineConfig::default()
        };
        let url = config.public_url(Path::new("storage/videos/withsfx_video_1.mp4"));
        assert_eq!(url, "https://cdn.example.com/videos/withsfx_video_1.mp4");
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("newsreel.json");
        fs::write(&path, "{ not json").unwrap();
        let config = PipelineConfig::load(&path);
        assert!(config.frame_rate > 0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("newsreel.json");
        fs::write(&path, r#"{ "width": 720, "height": 1280 }"#).unwrap();
        let config = PipelineConfig::load(&path);
        assert_eq!(config.width, 720);
        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.quality, VideoQuality::Medium);
    }

    #[test]
    fn test_zero_frame_rate_file_is_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("newsreel.json");
        fs::write(&path, r#"{ "frame_rate": 0 }"#).unwrap();
        let config = PipelineConfig::load(&path);
        assert_eq!(config.frame_rate, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unencodable_geometry() {
        let flat = PipelineConfig {
            height: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(flat.validate(), Err(NewsreelError::Configuration(_))));

        let odd = PipelineConfig {
            width: 721,
            ..PipelineConfig::default()
        };
        assert!(matches!(odd.validate(), Err(NewsreelError::Configuration(_))));
        assert!(PipelineConfig::default().validate().is_ok());
    }
}
