// NEWSREEL Scene Composer
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Studio layout, top to bottom (fractions of frame height):
//   0.00-0.04  logo strip
//   0.05-0.17  headline banner (0.05-0.21 in short format)
//   ....-0.62  anchor sprite, feet on the desk line
//   0.62-0.74  desk + props
//   0.76-0.90  footer image
//   0.92-0.97  ticker
//
// The static layer is drawn once; each frame copies it and composites the
// anchor sprite at a fixed position.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tiny_skia::{
    Color, FilterQuality, GradientStop, LinearGradient, Paint, PathBuilder, Pixmap, PixmapPaint,
    Point, Rect, SpreadMode, Transform,
};
use tracing::{debug, info, warn};

use crate::animation::amplitude::AmplitudeTrack;
use crate::animation::frame_library::FrameLibrary;
use crate::animation::state::CharacterStateMachine;
use crate::animation::text::{Align, TextBox};
use crate::error::{NewsreelError, Result};
use crate::models::{FrameSequence, GeneratedContent, NewsItem};
use crate::studio::assets::{AssetBundle, AssetRole};

const DESK_TOP: f32 = 0.62;
const HEADLINE_LIMIT: usize = 120;
const SHORT_HEADLINE_LIMIT: usize = 60;
const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Everything the composer needs from one news item.
#[derive(Clone)]
pub struct ContentMetadata {
    pub headline: String,
    pub source: String,
    pub category: String,
    pub sentiment: String,
    pub footer_image: Option<Pixmap>,
    pub is_short_format: bool,
}

impl ContentMetadata {
    pub fn from_inputs(news: &NewsItem, content: &GeneratedContent, is_short_format: bool) -> Self {
        Self {
            headline: news.title.trim().to_string(),
            source: news.source.trim().to_string(),
            category: news.category.trim().to_string(),
            sentiment: content.sentiment.trim().to_lowercase(),
            footer_image: None,
            is_short_format,
        }
    }

    pub fn with_footer_image(mut self, image: Option<Pixmap>) -> Self {
        self.footer_image = image;
        self
    }

    /// Headline as drawn: short format gets a tighter character limit.
    pub fn display_headline(&self) -> String {
        let limit = if self.is_short_format {
            SHORT_HEADLINE_LIMIT
        } else {
            HEADLINE_LIMIT
        };
        truncate_chars(&self.headline, limit)
    }
}

pub struct SceneComposer<'a> {
    assets: &'a AssetBundle,
    library: &'a FrameLibrary,
    machine: CharacterStateMachine,
    width: u32,
    height: u32,
}

impl<'a> SceneComposer<'a> {
    pub fn new(assets: &'a AssetBundle, library: &'a FrameLibrary, width: u32, height: u32) -> Self {
        Self {
            assets,
            library,
            machine: CharacterStateMachine::new(assets.character.accessories.clone()),
            width,
            height,
        }
    }

    /// Top-left corner of the anchor sprite.
    pub fn anchor_position(&self) -> (i32, i32) {
        let rig = &self.assets.character;
        let x = (self.width as i32 - rig.sprite_width as i32) / 2;
        let y = (self.height as f32 * DESK_TOP) as i32 - rig.sprite_height as i32;
        (x, y)
    }

    pub fn compose_static_layer(&self, meta: &ContentMetadata) -> Result<Pixmap> {
        let mut layer = new_canvas(self.width, self.height)?;
        let (w, h) = (self.width as f32, self.height as f32);

        match self.assets.get(AssetRole::Background) {
            Some(bg) => draw_cover(&mut layer, bg),
            None => draw_default_background(&mut layer, w, h),
        }

        let desk = Rect::from_xywh(0.0, h * DESK_TOP, w, h * 0.12);
        match (self.assets.get(AssetRole::Desk), desk) {
            (Some(img), Some(area)) => draw_fit(&mut layer, img, area),
            (None, Some(area)) => draw_default_desk(&mut layer, area),
            _ => {}
        }

        let props = Rect::from_xywh(w * 0.72, h * (DESK_TOP - 0.07), w * 0.2, h * 0.07);
        match (self.assets.get(AssetRole::Props), props) {
            (Some(img), Some(area)) => draw_fit(&mut layer, img, area),
            (None, Some(area)) => draw_default_props(&mut layer, area),
            _ => {}
        }

        let logo = Rect::from_xywh(w * 0.04, h * 0.008, w * 0.22, h * 0.032);
        match (self.assets.get(AssetRole::Logo), logo) {
            (Some(img), Some(area)) => draw_fit(&mut layer, img, area),
            (None, Some(area)) => {
                fill_rect(&mut layer, area, Color::from_rgba8(200, 30, 40, 255));
                self.draw_text(&mut layer, "NEWSREEL", area, area.height() * 0.7, Align::Center);
            }
            _ => {}
        }

        self.draw_headline(&mut layer, meta, w, h);

        if let (Some(img), Some(area)) = (&meta.footer_image, Rect::from_xywh(w * 0.1, h * 0.76, w * 0.8, h * 0.14)) {
            draw_fit(&mut layer, img, area);
        }

        self.draw_ticker(&mut layer, meta, w, h);
        Ok(layer)
    }

    fn draw_headline(&self, layer: &mut Pixmap, meta: &ContentMetadata, w: f32, h: f32) {
        let (band_height, size) = if meta.is_short_format {
            (h * 0.16, h * 0.034)
        } else {
            (h * 0.12, h * 0.026)
        };
        let Some(band) = Rect::from_xywh(w * 0.03, h * 0.05, w * 0.94, band_height) else {
            return;
        };
        fill_rect(layer, band, sentiment_color(&meta.sentiment));
        if let Some(strip) = Rect::from_xywh(band.x(), band.bottom() - h * 0.006, band.width(), h * 0.006) {
            fill_rect(layer, strip, Color::from_rgba8(255, 200, 40, 255));
        }
        let inner = Rect::from_xywh(band.x() + w * 0.03, band.y() + h * 0.012, band.width() - w * 0.06, band_height - h * 0.024);
        if let Some(inner) = inner {
            self.draw_text(layer, &meta.display_headline(), inner, size, Align::Center);
        }
    }

    fn draw_ticker(&self, layer: &mut Pixmap, meta: &ContentMetadata, w: f32, h: f32) {
        let Some(band) = Rect::from_xywh(0.0, h * 0.92, w, h * 0.05) else {
            return;
        };
        fill_rect(layer, band, Color::from_rgba8(15, 15, 25, 235));

        let text = if meta.is_short_format || meta.category.is_empty() {
            meta.source.to_uppercase()
        } else {
            format!("{}  |  {}", meta.category.to_uppercase(), meta.source.to_uppercase())
        };
        if text.is_empty() {
            return;
        }
        if let Some(inner) = Rect::from_xywh(w * 0.04, band.y() + h * 0.012, w * 0.92, h * 0.03) {
            self.draw_text(layer, &text, inner, h * 0.02, Align::Left);
        }
    }

    fn draw_text(&self, layer: &mut Pixmap, text: &str, area: Rect, size: f32, align: Align) {
        match &self.assets.font {
            Some(font) => {
                font.draw(
                    layer,
                    text,
                    TextBox {
                        x: area.x(),
                        y: area.y(),
                        max_width: area.width(),
                        max_height: Some(area.height()),
                        size,
                        align,
                    },
                    WHITE,
                );
            }
            None => draw_text_placeholder(layer, text, area, size),
        }
    }

    /// Renders every frame of `track` into a fresh `seq_<timestamp>` directory.
    pub fn render_sequence(
        &self,
        track: &AmplitudeTrack,
        meta: &ContentMetadata,
        frames_root: &Path,
    ) -> Result<FrameSequence> {
        if track.is_empty() {
            return Err(NewsreelError::render("amplitude track has no frames"));
        }
        let directory = fresh_sequence_dir(frames_root)?;
        info!(
            "[SCENE] Rendering {} frames at {} fps into {:?}",
            track.len(),
            track.frame_rate(),
            directory
        );

        let static_layer = self.compose_static_layer(meta)?;
        let mut canvas = new_canvas(self.width, self.height)?;
        let (ax, ay) = self.anchor_position();
        let rig = &self.assets.character;

        let mut frames = Vec::with_capacity(track.len());
        let mut direct_draws = 0usize;

        for index in 0..track.len() {
            canvas.data_mut().copy_from_slice(static_layer.data());

            let state = self
                .machine
                .state_at(track.time_at(index), track.get(index), track.previous(index));

            match self.library.get_frame(state.mouth, state.eye, state.head_rotation) {
                Some(sprite) => blit(&mut canvas, sprite, ax, ay),
                None => {
                    if direct_draws == 0 {
                        warn!("[SCENE] ⚠️ Sprite cache miss, drawing the anchor directly");
                    }
                    direct_draws += 1;
                    let sprite = rig.render_sprite(state.mouth, state.eye, state.head_rotation)?;
                    blit(&mut canvas, &sprite, ax, ay);
                }
            }

            let path = directory.join(FrameSequence::frame_file_name(index));
            canvas
                .save_png(&path)
                .map_err(|e| NewsreelError::render(format!("failed to write {:?}: {}", path, e)))?;
            frames.push(path);

            if index > 0 && index % 300 == 0 {
                debug!("[SCENE] {} / {} frames", index, track.len());
            }
        }

        if direct_draws > 0 {
            warn!("[SCENE] {} of {} frames drawn without the sprite cache", direct_draws, frames.len());
        }
        info!("[SCENE] ✅ {} frames written", frames.len());

        Ok(FrameSequence {
            directory,
            frame_count: frames.len(),
            frames,
            frame_rate: track.frame_rate(),
            is_short_format: meta.is_short_format,
        })
    }
}

fn fresh_sequence_dir(frames_root: &Path) -> Result<PathBuf> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let mut directory = frames_root.join(format!("seq_{}", stamp));
    let mut suffix = 1;
    while directory.exists() {
        directory = frames_root.join(format!("seq_{}_{}", stamp, suffix));
        suffix += 1;
    }
    fs::create_dir_all(&directory)?;
    Ok(directory)
}

fn new_canvas(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height)
        .ok_or_else(|| NewsreelError::render(format!("cannot allocate {}x{} canvas", width, height)))
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

fn sentiment_color(sentiment: &str) -> Color {
    match sentiment {
        "positive" => Color::from_rgba8(20, 120, 70, 240),
        "negative" => Color::from_rgba8(160, 25, 35, 240),
        _ => Color::from_rgba8(20, 45, 110, 240),
    }
}

fn fill_rect(pixmap: &mut Pixmap, rect: Rect, color: Color) {
    let mut paint = Paint::default();
    paint.set_color(color);
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
}

fn blit(canvas: &mut Pixmap, sprite: &Pixmap, x: i32, y: i32) {
    canvas.draw_pixmap(x, y, sprite.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
}

fn draw_scaled(canvas: &mut Pixmap, image: &Pixmap, scale: f32, dx: f32, dy: f32) {
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    let transform = Transform::from_row(scale, 0.0, 0.0, scale, dx, dy);
    canvas.draw_pixmap(0, 0, image.as_ref(), &paint, transform, None);
}

/// Scale to cover the whole canvas, centered.
fn draw_cover(canvas: &mut Pixmap, image: &Pixmap) {
    let (cw, ch) = (canvas.width() as f32, canvas.height() as f32);
    let (iw, ih) = (image.width() as f32, image.height() as f32);
    let scale = (cw / iw).max(ch / ih);
    draw_scaled(canvas, image, scale, (cw - iw * scale) / 2.0, (ch - ih * scale) / 2.0);
}

/// Scale to fit inside `area`, centered, aspect preserved.
fn draw_fit(canvas: &mut Pixmap, image: &Pixmap, area: Rect) {
    let (iw, ih) = (image.width() as f32, image.height() as f32);
    let scale = (area.width() / iw).min(area.height() / ih);
    let dx = area.x() + (area.width() - iw * scale) / 2.0;
    let dy = area.y() + (area.height() - ih * scale) / 2.0;
    draw_scaled(canvas, image, scale, dx, dy);
}

fn draw_default_background(canvas: &mut Pixmap, w: f32, h: f32) {
    let shader = LinearGradient::new(
        Point::from_xy(0.0, 0.0),
        Point::from_xy(0.0, h),
        vec![
            GradientStop::new(0.0, Color::from_rgba8(12, 24, 58, 255)),
            GradientStop::new(1.0, Color::from_rgba8(38, 70, 130, 255)),
        ],
        SpreadMode::Pad,
        Transform::identity(),
    );
    match (shader, Rect::from_xywh(0.0, 0.0, w, h)) {
        (Some(shader), Some(rect)) => {
            let paint = Paint {
                shader,
                ..Paint::default()
            };
            canvas.fill_rect(rect, &paint, Transform::identity(), None);
        }
        _ => canvas.fill(Color::from_rgba8(20, 40, 90, 255)),
    }

    // Skyline windows behind the anchor
    for col in 0..6 {
        for row in 0..4 {
            let x = w * (0.06 + col as f32 * 0.155);
            let y = h * (0.24 + row as f32 * 0.075);
            if let Some(win) = Rect::from_xywh(x, y, w * 0.1, h * 0.05) {
                let glow = if (col + row) % 3 == 0 { 70 } else { 40 };
                fill_rect(canvas, win, Color::from_rgba8(200, 220, 255, glow));
            }
        }
    }
}

fn draw_default_desk(canvas: &mut Pixmap, area: Rect) {
    fill_rect(canvas, area, Color::from_rgba8(70, 42, 28, 255));
    if let Some(top) = Rect::from_xywh(area.x(), area.y(), area.width(), area.height() * 0.12) {
        fill_rect(canvas, top, Color::from_rgba8(120, 78, 50, 255));
    }
    if let Some(panel) = Rect::from_xywh(
        area.x() + area.width() * 0.3,
        area.y() + area.height() * 0.3,
        area.width() * 0.4,
        area.height() * 0.45,
    ) {
        fill_rect(canvas, panel, Color::from_rgba8(200, 30, 40, 255));
    }
}

/// Coffee mug at the right end of the desk.
fn draw_default_props(canvas: &mut Pixmap, area: Rect) {
    let mug_w = area.height() * 0.7;
    let x = area.right() - mug_w * 1.6;
    let y = area.y() + area.height() * 0.25;
    if let Some(body) = Rect::from_xywh(x, y, mug_w, area.height() * 0.75) {
        fill_rect(canvas, body, Color::from_rgba8(235, 235, 240, 255));
    }
    if let Some(handle) = PathBuilder::from_circle(x + mug_w * 1.1, y + area.height() * 0.35, mug_w * 0.22) {
        let mut paint = Paint::default();
        paint.set_color(Color::from_rgba8(235, 235, 240, 255));
        paint.anti_alias = true;
        let stroke = tiny_skia::Stroke {
            width: (mug_w * 0.1).max(1.0),
            ..tiny_skia::Stroke::default()
        };
        canvas.stroke_path(&handle, &paint, &stroke, Transform::identity(), None);
    }
}

/// Without a font, text is stood in for by translucent line bars.
fn draw_text_placeholder(canvas: &mut Pixmap, text: &str, area: Rect, size: f32) {
    let chars = text.chars().count() as f32;
    if chars == 0.0 || size <= 0.0 {
        return;
    }
    let line_height = size * 1.2;
    let max_lines = ((area.height() / line_height).floor() as usize).max(1);
    let text_width = chars * size * 0.55;
    let lines = ((text_width / area.width()).ceil() as usize).clamp(1, max_lines);

    for line in 0..lines {
        let width = if line + 1 == lines {
            (text_width - area.width() * line as f32).clamp(size, area.width())
        } else {
            area.width()
        };
        let y = area.y() + line as f32 * line_height + size * 0.2;
        if let Some(bar) = Rect::from_xywh(area.x(), y, width, size * 0.6) {
            fill_rect(canvas, bar, Color::from_rgba8(255, 255, 255, 200));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::amplitude::AmplitudeSource;
    use crate::animation::frame_library::RotationLattice;

    fn metadata(short: bool) -> ContentMetadata {
        ContentMetadata {
            headline: "Local Man Teaches Pigeons To File Taxes".to_string(),
            source: "Daily Oddity".to_string(),
            category: "animals".to_string(),
            sentiment: "positive".to_string(),
            footer_image: None,
            is_short_format: short,
        }
    }

    #[test]
    fn test_short_format_truncates_headline() {
        let mut meta = metadata(true);
        meta.headline = "word ".repeat(40);
        let shown = meta.display_headline();
        assert!(shown.chars().count() <= SHORT_HEADLINE_LIMIT);
        assert!(shown.ends_with("..."));

        meta.is_short_format = false;
        assert!(meta.display_headline().chars().count() <= HEADLINE_LIMIT);
    }

    #[test]
    fn test_static_layer_fills_frame() {
        let assets = AssetBundle::builtin(180, 320);
        let library = FrameLibrary::new(None);
        let composer = SceneComposer::new(&assets, &library, 180, 320);
        let layer = composer.compose_static_layer(&metadata(false)).unwrap();
        assert_eq!((layer.width(), layer.height()), (180, 320));
        assert!(layer.pixels().iter().all(|p| p.alpha() == 255));
    }

    #[test]
    fn test_custom_studio_images_replace_defaults() {
        let mut assets = AssetBundle::builtin(180, 320);
        let mut backdrop = Pixmap::new(18, 32).unwrap();
        backdrop.fill(Color::from_rgba8(255, 0, 255, 255));
        let mut desk = Pixmap::new(18, 4).unwrap();
        desk.fill(Color::from_rgba8(0, 0, 255, 255));
        assets.background = Some(backdrop);
        assets.desk = Some(desk);

        let library = FrameLibrary::new(None);
        let composer = SceneComposer::new(&assets, &library, 180, 320);
        let layer = composer.compose_static_layer(&metadata(false)).unwrap();
        let wall = layer.pixel(20, (320.0 * 0.45) as u32).unwrap();
        assert_eq!((wall.red(), wall.green(), wall.blue()), (255, 0, 255));
        let counter = layer.pixel(90, (320.0 * 0.68) as u32).unwrap();
        assert_eq!((counter.red(), counter.green(), counter.blue()), (0, 0, 255));
    }

    #[test]
    fn test_footer_image_is_drawn() {
        let assets = AssetBundle::builtin(180, 320);
        let library = FrameLibrary::new(None);
        let composer = SceneComposer::new(&assets, &library, 180, 320);

        let mut footer = Pixmap::new(10, 10).unwrap();
        footer.fill(Color::from_rgba8(0, 255, 0, 255));
        let layer = composer
            .compose_static_layer(&metadata(false).with_footer_image(Some(footer)))
            .unwrap();
        let center = layer.pixel(90, (320.0 * 0.83) as u32).unwrap();
        assert_eq!((center.red(), center.green(), center.blue()), (0, 255, 0));
    }

    #[test]
    fn test_render_sequence_writes_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let assets = AssetBundle::builtin(180, 320);
        let mut library = FrameLibrary::new(None);
        library
            .initialize_with_lattice(&assets.character, RotationLattice::coarse())
            .unwrap();
        let composer = SceneComposer::new(&assets, &library, 180, 320);

        let track = AmplitudeTrack::new(vec![0.1, 0.7, 0.7, 0.05, 0.3], 10, 0.5, AmplitudeSource::Synthetic);
        let seq = composer.render_sequence(&track, &metadata(false), dir.path()).unwrap();

        assert_eq!(seq.frame_count, 5);
        assert_eq!(seq.frame_rate, 10);
        assert!(seq.directory.file_name().unwrap().to_string_lossy().starts_with("seq_"));
        assert_eq!(seq.frames[0].file_name().unwrap(), "frame_00000.png");
        for frame in &seq.frames {
            let decoded = Pixmap::load_png(frame).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (180, 320));
        }
    }

    #[test]
    fn test_uninitialized_library_draws_directly() {
        let dir = tempfile::tempdir().unwrap();
        let assets = AssetBundle::builtin(180, 320);
        let library = FrameLibrary::new(None);
        let composer = SceneComposer::new(&assets, &library, 180, 320);

        let track = AmplitudeTrack::new(vec![0.5; 3], 10, 0.3, AmplitudeSource::Synthetic);
        let seq = composer.render_sequence(&track, &metadata(true), dir.path()).unwrap();
        assert_eq!(seq.frame_count, 3);
        assert!(seq.is_short_format);
    }

    #[test]
    fn test_two_runs_get_distinct_directories() {
        let dir = tempfile::tempdir().unwrap();
        let a = fresh_sequence_dir(dir.path()).unwrap();
        let b = fresh_sequence_dir(dir.path()).unwrap();
        assert_ne!(a, b);
    }
}
