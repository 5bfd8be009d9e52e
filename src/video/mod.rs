// NEWSREEL Video Modules
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL

pub mod assembler;
pub mod cleanup;
pub mod encoder;
pub mod sound_effects;
pub mod subtitles;

pub use assembler::VideoAssembler;
pub use cleanup::{sweep, CleanupReport};
pub use encoder::{Encoder, EncoderStage, FfmpegEncoder};
pub use sound_effects::{Sting, StingKind, StingLibrary};
pub use subtitles::{SubtitleCue, SubtitleStyle};
