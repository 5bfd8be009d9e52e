// NEWSREEL Shared Records
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A novelty news item, as handed over by the news collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub source: String,
    pub category: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Commentary produced by the language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub commentary: String,
    #[serde(default = "default_sentiment")]
    pub sentiment: String,
    #[serde(default)]
    pub image_search_terms: Vec<String>,
}

fn default_sentiment() -> String {
    "neutral".to_string()
}

/// One video's rendered frames on disk.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    pub directory: PathBuf,
    pub frames: Vec<PathBuf>,
    pub frame_count: usize,
    pub frame_rate: u32,
    pub is_short_format: bool,
}

impl FrameSequence {
    /// printf-style input pattern for the encoder.
    pub fn input_pattern(&self) -> PathBuf {
        self.directory.join("frame_%05d.png")
    }

    pub fn frame_file_name(index: usize) -> String {
        format!("frame_{:05}.png", index)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoResult {
    pub path: PathBuf,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub url: String,
    pub is_short_format: bool,
}
