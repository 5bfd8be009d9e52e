// NEWSREEL Video Pipeline
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// One video end to end:
//   speech -> amplitudes -> frames -> mux -> subtitles -> sound effects
//
// Only frame rendering and the mux are fatal. Subtitle and sound-effect
// failures hand the previous stage's file through unchanged.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

use crate::animation::amplitude::{AmplitudeAnalyzer, AmplitudeTrack};
use crate::animation::frame_library::{FrameLibrary, LibraryStats};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{GeneratedContent, NewsItem, VideoResult};
use crate::studio::assets::AssetBundle;
use crate::studio::composer::{ContentMetadata, SceneComposer};
use crate::studio::image_cache::{ImageCache, DEFAULT_CAPACITY};
use crate::video::assembler::VideoAssembler;
use crate::video::cleanup::{self, CleanupReport};
use crate::video::encoder::{Encoder, FfmpegEncoder};
use crate::video::sound_effects::StingLibrary;
use crate::video::subtitles::{build_cues, write_srt, SubtitleStyle};

pub struct VideoProcessor {
    config: PipelineConfig,
    assets: AssetBundle,
    library: FrameLibrary,
    images: ImageCache,
    analyzer: AmplitudeAnalyzer,
    assembler: VideoAssembler,
    stings: StingLibrary,
}

impl VideoProcessor {
    /// Real ffmpeg, assets loaded from `config.asset_root`.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let encoder = Arc::new(FfmpegEncoder::from_config(&config));
        Self::with_encoder(config, encoder)
    }

    pub fn with_encoder(config: PipelineConfig, encoder: Arc<dyn Encoder>) -> Result<Self> {
        let assets = AssetBundle::load(&config.asset_root, config.width, config.height);
        Self::with_assets(config, encoder, assets)
    }

    pub fn with_assets(config: PipelineConfig, encoder: Arc<dyn Encoder>, assets: AssetBundle) -> Result<Self> {
        config.validate()?;
        let images = ImageCache::new(config.images_dir(), DEFAULT_CAPACITY)?;
        let analyzer = AmplitudeAnalyzer::new(encoder.clone(), config.frame_rate);
        let assembler = VideoAssembler::from_config(encoder, &config);
        let stings = StingLibrary::new(&config.asset_root);
        let library = FrameLibrary::new(Some(config.frame_library_dir.clone()));

        Ok(Self {
            config,
            assets,
            library,
            images,
            analyzer,
            assembler,
            stings,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn assets(&self) -> &AssetBundle {
        &self.assets
    }

    pub fn library(&self) -> &FrameLibrary {
        &self.library
    }

    /// Builds (or loads) the sprite library; a no-op once initialized.
    pub fn warm_library(&mut self) -> Result<LibraryStats> {
        self.library
            .initialize(&self.assets, self.config.fine_rotation_lattice)?;
        Ok(self.library.stats())
    }

    pub async fn analyze(&self, speech: &Path) -> AmplitudeTrack {
        self.analyzer.analyze(speech).await
    }

    pub async fn produce(
        &mut self,
        news: &NewsItem,
        content: &GeneratedContent,
        speech: &Path,
    ) -> Result<VideoResult> {
        info!("[PIPELINE] 📰 Producing video for {:?}", news.title);
        for dir in [
            self.config.frames_dir(),
            self.config.videos_dir(),
            self.config.subtitles_dir(),
        ] {
            fs::create_dir_all(&dir)?;
        }

        if let Err(e) = self.warm_library() {
            warn!("[PIPELINE] ⚠️ Sprite library unavailable ({}), frames will be drawn directly", e);
        }

        let track = self.analyzer.analyze(speech).await;
        let duration = track.duration();
        let is_short_format = self.config.is_short_format(duration);

        let footer = match news.image_url.as_deref() {
            Some(url) if !url.trim().is_empty() => self.images.footer_image(url).await,
            _ => None,
        };
        let meta = ContentMetadata::from_inputs(news, content, is_short_format).with_footer_image(footer);

        let composer = SceneComposer::new(&self.assets, &self.library, self.config.width, self.config.height);
        let frames = composer
            .render_sequence(&track, &meta, &self.config.frames_dir())
            .map_err(|e| {
                error!("[PIPELINE] ❌ Frame rendering failed: {}", e);
                e
            })?;

        let video_id = new_video_id();
        let muxed = self.assembler.mux(&frames, speech, &video_id).await.map_err(|e| {
            error!("[PIPELINE] ❌ Mux failed for {:?}: {}", frames.directory, e);
            e
        })?;

        let subtitled = self
            .subtitle_stage(&muxed, &content.commentary, duration, is_short_format, &video_id)
            .await;
        let finished = self
            .sound_effect_stage(&subtitled, &news.category, duration, is_short_format)
            .await;

        let result = VideoResult {
            url: self.config.public_url(&finished),
            path: finished,
            duration,
            width: self.config.width,
            height: self.config.height,
            is_short_format,
        };
        info!("[PIPELINE] ✅ Finished {:?} ({:.1}s)", result.path, result.duration);
        Ok(result)
    }

    async fn subtitle_stage(
        &self,
        input: &Path,
        commentary: &str,
        duration: f64,
        is_short_format: bool,
        video_id: &str,
    ) -> PathBuf {
        let style = SubtitleStyle::select(duration, is_short_format);
        let cues = build_cues(commentary, duration, style);
        if cues.is_empty() {
            info!("[PIPELINE] No commentary to subtitle");
            return input.to_path_buf();
        }

        let srt = self.config.subtitles_dir().join(format!("subs_{}.srt", video_id));
        let burned = match write_srt(&cues, &srt) {
            Ok(()) => self.assembler.burn_subtitles(input, &srt, style).await,
            Err(e) => Err(e),
        };
        match burned {
            Ok(path) => path,
            Err(e) => {
                warn!("[PIPELINE] ⚠️ Subtitle pass failed for {:?}: {}. Keeping unsubtitled video.", input, e);
                input.to_path_buf()
            }
        }
    }

    async fn sound_effect_stage(&self, input: &Path, category: &str, duration: f64, is_short_format: bool) -> PathBuf {
        let stings = self.stings.plan(category, duration, is_short_format);
        match self.assembler.mix_sound_effects(input, &stings).await {
            Ok(path) => path,
            Err(e) => {
                warn!("[PIPELINE] ⚠️ Sound-effect pass failed for {:?}: {}. Keeping previous video.", input, e);
                input.to_path_buf()
            }
        }
    }

    /// Drops in-memory sprites and images; disk caches stay.
    pub fn release_memory(&mut self) {
        self.library.clear_memory();
        self.images.clear_memory();
    }

    /// Retention sweep over intermediate storage.
    pub fn sweep(&self) -> CleanupReport {
        self.sweep_older_than(self.config.frame_retention())
    }

    pub fn sweep_older_than(&self, max_age: std::time::Duration) -> CleanupReport {
        cleanup::sweep(
            &[
                self.config.frames_dir(),
                self.config.subtitles_dir(),
                self.config.images_dir(),
            ],
            max_age,
        )
    }
}

fn new_video_id() -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}{:03}", now.as_secs(), now.subsec_millis())
}
