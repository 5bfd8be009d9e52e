// NEWSREEL Error Types
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL

use thiserror::Error;

use crate::video::encoder::EncoderStage;

#[derive(Debug, Error)]
pub enum NewsreelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// A studio asset exists but could not be used.
    #[error("Asset error: {0}")]
    Asset(String),

    #[error("Audio analysis error: {0}")]
    Analysis(String),

    #[error("Render error: {0}")]
    Render(String),

    /// External encoder exited non-zero or could not be spawned.
    #[error("{stage} stage failed ({status}): {message}")]
    Encoder {
        stage: EncoderStage,
        status: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl NewsreelError {
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, NewsreelError>;
