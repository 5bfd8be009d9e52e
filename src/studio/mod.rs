// NEWSREEL Studio Modules
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL

pub mod assets;
pub mod composer;
pub mod image_cache;

pub use assets::{AssetBundle, AssetRole};
pub use composer::{ContentMetadata, SceneComposer};
pub use image_cache::ImageCache;
