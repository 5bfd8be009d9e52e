// NEWSREEL Library Root
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL

pub mod animation;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod studio;
pub mod video;

pub use config::PipelineConfig;
pub use error::{NewsreelError, Result};
pub use pipeline::VideoProcessor;
