// NEWSREEL Anchor Character Rig
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Draws the cartoon anchor with tiny-skia primitives. The torso is static;
// the head group (face, hair, eyes, mouth, head-worn accessories) is rotated
// around the neck pivot.

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tiny_skia::{
    Color, FillRule, LineCap, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

use crate::animation::state::{EyeState, MouthState};
use crate::error::{NewsreelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessory {
    Glasses,
    Headset,
    LapelPin,
}

impl Accessory {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Glasses),
            1 => Some(Self::Headset),
            2 => Some(Self::LapelPin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub skin: Color,
    pub hair: Color,
    pub suit: Color,
    pub shirt: Color,
    pub tie: Color,
    pub outline: Color,
    pub mouth: Color,
    pub tongue: Color,
}

impl Palette {
    /// Short hash of every colour at 8-bit precision.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for color in [
            self.skin,
            self.hair,
            self.suit,
            self.shirt,
            self.tie,
            self.outline,
            self.mouth,
            self.tongue,
        ] {
            let c = color.to_color_u8();
            hasher.update([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        hasher.finalize().iter().take(4).map(|b| format!("{:02x}", b)).collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            skin: Color::from_rgba8(246, 206, 170, 255),
            hair: Color::from_rgba8(58, 40, 30, 255),
            suit: Color::from_rgba8(36, 52, 92, 255),
            shirt: Color::from_rgba8(240, 240, 245, 255),
            tie: Color::from_rgba8(196, 32, 48, 255),
            outline: Color::from_rgba8(30, 24, 22, 255),
            mouth: Color::from_rgba8(92, 24, 30, 255),
            tongue: Color::from_rgba8(226, 104, 112, 255),
        }
    }
}

/// Geometry and look of the anchor. Sprites are `sprite_width x sprite_height`
/// with a transparent background.
#[derive(Debug, Clone)]
pub struct CharacterRig {
    pub sprite_width: u32,
    pub sprite_height: u32,
    pub palette: Palette,
    pub accessories: BTreeSet<usize>,
}

impl CharacterRig {
    pub fn new(sprite_width: u32, sprite_height: u32) -> Self {
        Self {
            sprite_width: sprite_width.max(16),
            sprite_height: sprite_height.max(16),
            palette: Palette::default(),
            accessories: BTreeSet::new(),
        }
    }

    /// Rig sized for a given output frame.
    pub fn for_frame(width: u32, height: u32) -> Self {
        let sprite_width = (width as f32 * 0.56).round() as u32;
        let sprite_height = ((sprite_width as f32 * 1.15).round() as u32).min(height / 2);
        Self::new(sprite_width, sprite_height)
    }

    pub fn with_accessories(mut self, accessories: impl IntoIterator<Item = usize>) -> Self {
        self.accessories = accessories.into_iter().collect();
        self
    }

    /// Identifies sprites drawn by this rig on disk.
    pub fn fingerprint(&self) -> String {
        let accessories = if self.accessories.is_empty() {
            "plain".to_string()
        } else {
            self.accessories
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join("-")
        };
        format!(
            "rig_{}x{}_acc-{}_pal-{}",
            self.sprite_width,
            self.sprite_height,
            accessories,
            self.palette.digest()
        )
    }

    fn has(&self, accessory: Accessory) -> bool {
        self.accessories
            .iter()
            .any(|&i| Accessory::from_index(i) == Some(accessory))
    }

    pub fn render_sprite(&self, mouth: MouthState, eye: EyeState, rotation_degrees: f32) -> Result<Pixmap> {
        let mut pixmap = Pixmap::new(self.sprite_width, self.sprite_height).ok_or_else(|| {
            NewsreelError::render(format!(
                "cannot allocate {}x{} sprite",
                self.sprite_width, self.sprite_height
            ))
        })?;

        let g = Geometry::new(self.sprite_width as f32, self.sprite_height as f32);
        self.draw_torso(&mut pixmap, &g);

        let head = Transform::from_rotate_at(rotation_degrees, g.cx, g.neck_y);
        self.draw_head(&mut pixmap, &g, head);
        self.draw_eyes(&mut pixmap, &g, eye, head);
        self.draw_mouth(&mut pixmap, &g, mouth, head);
        if self.has(Accessory::Glasses) {
            self.draw_glasses(&mut pixmap, &g, head);
        }
        if self.has(Accessory::Headset) {
            self.draw_headset(&mut pixmap, &g, head);
        }

        Ok(pixmap)
    }

    fn draw_torso(&self, pixmap: &mut Pixmap, g: &Geometry) {
        let id = Transform::identity();
        let p = &self.palette;

        // Shoulders
        let mut pb = PathBuilder::new();
        pb.move_to(g.cx - g.shoulder_half, g.h);
        pb.line_to(g.cx - g.shoulder_half, g.torso_top + g.unit * 1.2);
        pb.quad_to(g.cx - g.shoulder_half, g.torso_top, g.cx - g.shoulder_half + g.unit * 1.5, g.torso_top);
        pb.line_to(g.cx + g.shoulder_half - g.unit * 1.5, g.torso_top);
        pb.quad_to(g.cx + g.shoulder_half, g.torso_top, g.cx + g.shoulder_half, g.torso_top + g.unit * 1.2);
        pb.line_to(g.cx + g.shoulder_half, g.h);
        pb.close();
        fill_outlined(pixmap, pb.finish(), p.suit, p.outline, g.line, id);

        // Neck
        let neck = Rect::from_xywh(g.cx - g.unit * 0.9, g.neck_y - g.unit * 0.6, g.unit * 1.8, g.torso_top - g.neck_y + g.unit * 0.8);
        if let Some(rect) = neck {
            fill(pixmap, Some(PathBuilder::from_rect(rect)), p.skin, id);
        }

        // Shirt collar wedge
        let mut pb = PathBuilder::new();
        pb.move_to(g.cx - g.unit * 1.6, g.torso_top);
        pb.line_to(g.cx + g.unit * 1.6, g.torso_top);
        pb.line_to(g.cx, g.torso_top + g.unit * 4.5);
        pb.close();
        fill_outlined(pixmap, pb.finish(), p.shirt, p.outline, g.line * 0.6, id);

        // Tie
        let mut pb = PathBuilder::new();
        pb.move_to(g.cx - g.unit * 0.5, g.torso_top + g.unit * 0.2);
        pb.line_to(g.cx + g.unit * 0.5, g.torso_top + g.unit * 0.2);
        pb.line_to(g.cx + g.unit * 0.8, g.torso_top + g.unit * 3.8);
        pb.line_to(g.cx, g.torso_top + g.unit * 4.6);
        pb.line_to(g.cx - g.unit * 0.8, g.torso_top + g.unit * 3.8);
        pb.close();
        fill_outlined(pixmap, pb.finish(), p.tie, p.outline, g.line * 0.5, id);

        if self.has(Accessory::LapelPin) {
            let pin = PathBuilder::from_circle(g.cx - g.shoulder_half * 0.55, g.torso_top + g.unit * 2.0, g.unit * 0.45);
            fill_outlined(pixmap, pin, Color::from_rgba8(232, 190, 60, 255), p.outline, g.line * 0.4, id);
        }
    }

    fn draw_head(&self, pixmap: &mut Pixmap, g: &Geometry, t: Transform) {
        let p = &self.palette;

        // Ears behind the face
        for side in [-1.0_f32, 1.0] {
            let ear = PathBuilder::from_circle(g.cx + side * g.head_rx, g.head_cy + g.unit * 0.4, g.unit * 0.9);
            fill_outlined(pixmap, ear, p.skin, p.outline, g.line, t);
        }

        let face = oval(g.cx, g.head_cy, g.head_rx, g.head_ry);
        fill_outlined(pixmap, face, p.skin, p.outline, g.line, t);

        // Swept hair cap
        let top = g.head_cy - g.head_ry;
        let mut pb = PathBuilder::new();
        pb.move_to(g.cx - g.head_rx * 1.02, g.head_cy - g.head_ry * 0.2);
        pb.cubic_to(
            g.cx - g.head_rx * 1.1, top - g.unit * 0.8,
            g.cx + g.head_rx * 0.6, top - g.unit * 1.4,
            g.cx + g.head_rx * 1.02, g.head_cy - g.head_ry * 0.35,
        );
        pb.quad_to(g.cx + g.head_rx * 0.2, top + g.unit * 1.6, g.cx - g.head_rx * 1.02, g.head_cy - g.head_ry * 0.2);
        pb.close();
        fill_outlined(pixmap, pb.finish(), p.hair, p.outline, g.line, t);

        // One skeptical eyebrow up, one flat
        let brow_y = g.eye_y - g.unit * 1.5;
        let mut pb = PathBuilder::new();
        pb.move_to(g.cx - g.eye_dx - g.unit * 0.9, brow_y);
        pb.line_to(g.cx - g.eye_dx + g.unit * 0.9, brow_y);
        pb.move_to(g.cx + g.eye_dx - g.unit * 0.9, brow_y - g.unit * 0.2);
        pb.quad_to(g.cx + g.eye_dx, brow_y - g.unit * 0.9, g.cx + g.eye_dx + g.unit * 0.9, brow_y - g.unit * 0.4);
        stroke(pixmap, pb.finish(), p.hair, g.line * 1.4, t);

        // Nose
        let mut pb = PathBuilder::new();
        pb.move_to(g.cx, g.eye_y + g.unit * 0.3);
        pb.quad_to(g.cx + g.unit * 0.7, g.eye_y + g.unit * 1.6, g.cx - g.unit * 0.1, g.eye_y + g.unit * 1.8);
        stroke(pixmap, pb.finish(), p.outline, g.line * 0.7, t);
    }

    fn draw_eyes(&self, pixmap: &mut Pixmap, g: &Geometry, eye: EyeState, t: Transform) {
        let white = Color::from_rgba8(255, 255, 255, 255);
        let outline = self.palette.outline;
        let r = g.unit * 0.75;

        for (i, side) in [-1.0_f32, 1.0].into_iter().enumerate() {
            let ex = g.cx + side * g.eye_dx;
            let ey = g.eye_y;
            let closed = match eye {
                EyeState::Squint => true,
                EyeState::Wink => i == 1,
                _ => false,
            };

            if closed {
                let mut pb = PathBuilder::new();
                pb.move_to(ex - r, ey);
                pb.quad_to(ex, ey + r * 0.6, ex + r, ey);
                stroke(pixmap, pb.finish(), outline, g.line * 1.2, t);
                continue;
            }

            let (rx, ry, pupil_r) = match eye {
                EyeState::Wide => (r * 1.3, r * 1.45, r * 0.35),
                _ => (r, r * 1.1, r * 0.45),
            };
            fill_outlined(pixmap, oval(ex, ey, rx, ry), white, outline, g.line * 0.8, t);

            let (px, py) = match eye {
                EyeState::Rolling => (ex + r * 0.2, ey - ry + pupil_r * 1.2),
                // Side-eye toward the camera-left, deadpan
                _ => (ex - r * 0.25, ey + r * 0.1),
            };
            fill(pixmap, PathBuilder::from_circle(px, py, pupil_r), outline, t);
        }
    }

    fn draw_mouth(&self, pixmap: &mut Pixmap, g: &Geometry, mouth: MouthState, t: Transform) {
        let p = &self.palette;
        let w = g.unit * 1.8;

        match mouth {
            MouthState::Closed => {
                let mut pb = PathBuilder::new();
                pb.move_to(g.cx - w, g.mouth_y);
                pb.quad_to(g.cx + w * 0.2, g.mouth_y + g.unit * 0.5, g.cx + w, g.mouth_y - g.unit * 0.35);
                stroke(pixmap, pb.finish(), p.outline, g.line * 1.1, t);
            }
            MouthState::HalfOpen => {
                let shape = oval(g.cx, g.mouth_y, w * 0.75, g.unit * 0.55);
                fill_outlined(pixmap, shape, p.mouth, p.outline, g.line, t);
            }
            MouthState::Open => {
                let shape = oval(g.cx, g.mouth_y + g.unit * 0.2, w * 0.85, g.unit * 1.1);
                fill_outlined(pixmap, shape, p.mouth, p.outline, g.line, t);
                let tongue = oval(g.cx, g.mouth_y + g.unit * 0.85, w * 0.5, g.unit * 0.4);
                fill(pixmap, tongue, p.tongue, t);
            }
        }
    }

    fn draw_glasses(&self, pixmap: &mut Pixmap, g: &Geometry, t: Transform) {
        let frame = Color::from_rgba8(20, 20, 24, 255);
        let r = g.unit * 1.25;
        for side in [-1.0_f32, 1.0] {
            stroke(pixmap, PathBuilder::from_circle(g.cx + side * g.eye_dx, g.eye_y, r), frame, g.line, t);
        }
        let mut pb = PathBuilder::new();
        pb.move_to(g.cx - g.eye_dx + r, g.eye_y);
        pb.line_to(g.cx + g.eye_dx - r, g.eye_y);
        stroke(pixmap, pb.finish(), frame, g.line, t);
    }

    fn draw_headset(&self, pixmap: &mut Pixmap, g: &Geometry, t: Transform) {
        let band = Color::from_rgba8(40, 40, 44, 255);
        let mut pb = PathBuilder::new();
        pb.move_to(g.cx - g.head_rx, g.head_cy);
        pb.cubic_to(
            g.cx - g.head_rx, g.head_cy - g.head_ry * 1.5,
            g.cx + g.head_rx, g.head_cy - g.head_ry * 1.5,
            g.cx + g.head_rx, g.head_cy,
        );
        stroke(pixmap, pb.finish(), band, g.line * 1.6, t);

        let mut pb = PathBuilder::new();
        pb.move_to(g.cx - g.head_rx, g.head_cy + g.unit * 0.4);
        pb.quad_to(g.cx - g.head_rx * 0.8, g.mouth_y + g.unit, g.cx - w_half(g), g.mouth_y);
        stroke(pixmap, pb.finish(), band, g.line, t);
        fill(pixmap, PathBuilder::from_circle(g.cx - w_half(g), g.mouth_y, g.unit * 0.35), band, t);
    }
}

fn w_half(g: &Geometry) -> f32 {
    g.unit * 2.4
}

/// Proportions derived from the sprite size; `unit` is 1/20 of the width.
struct Geometry {
    h: f32,
    cx: f32,
    unit: f32,
    line: f32,
    head_cy: f32,
    head_rx: f32,
    head_ry: f32,
    eye_y: f32,
    eye_dx: f32,
    mouth_y: f32,
    neck_y: f32,
    torso_top: f32,
    shoulder_half: f32,
}

impl Geometry {
    fn new(w: f32, h: f32) -> Self {
        let unit = w / 20.0;
        let head_cy = h * 0.36;
        let head_ry = unit * 5.6;
        Self {
            h,
            cx: w / 2.0,
            unit,
            line: (unit * 0.22).max(1.0),
            head_cy,
            head_rx: unit * 4.6,
            head_ry,
            eye_y: head_cy - unit * 0.6,
            eye_dx: unit * 1.8,
            mouth_y: head_cy + unit * 2.8,
            neck_y: head_cy + head_ry * 0.92,
            torso_top: head_cy + head_ry + unit * 0.6,
            shoulder_half: unit * 8.6,
        }
    }
}

fn oval(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Path> {
    Rect::from_xywh(cx - rx, cy - ry, rx * 2.0, ry * 2.0).and_then(PathBuilder::from_oval)
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

fn fill(pixmap: &mut Pixmap, path: Option<Path>, color: Color, t: Transform) {
    if let Some(path) = path {
        pixmap.fill_path(&path, &solid(color), FillRule::Winding, t, None);
    }
}

fn stroke(pixmap: &mut Pixmap, path: Option<Path>, color: Color, width: f32, t: Transform) {
    if let Some(path) = path {
        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &solid(color), &stroke, t, None);
    }
}

fn fill_outlined(pixmap: &mut Pixmap, path: Option<Path>, color: Color, outline: Color, width: f32, t: Transform) {
    if let Some(path) = path {
        pixmap.fill_path(&path, &solid(color), FillRule::Winding, t, None);
        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &solid(outline), &stroke, t, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_at(pixmap: &Pixmap, x: u32, y: u32) -> u8 {
        pixmap.pixel(x, y).map(|p| p.alpha()).unwrap_or(0)
    }

    #[test]
    fn test_sprite_has_transparent_corners() {
        let rig = CharacterRig::new(200, 230);
        let sprite = rig.render_sprite(MouthState::Open, EyeState::Neutral, 0.0).unwrap();
        assert_eq!(sprite.width(), 200);
        assert_eq!(alpha_at(&sprite, 0, 0), 0);
        assert_eq!(alpha_at(&sprite, 199, 0), 0);
        // Face center is opaque
        assert_eq!(alpha_at(&sprite, 100, (230.0 * 0.36) as u32), 255);
    }

    #[test]
    fn test_mouth_shapes_differ() {
        let rig = CharacterRig::new(160, 184);
        let closed = rig.render_sprite(MouthState::Closed, EyeState::Neutral, 0.0).unwrap();
        let open = rig.render_sprite(MouthState::Open, EyeState::Neutral, 0.0).unwrap();
        assert_ne!(closed.data(), open.data());
    }

    #[test]
    fn test_rotation_moves_head_only() {
        let rig = CharacterRig::new(160, 184);
        let straight = rig.render_sprite(MouthState::Closed, EyeState::Neutral, 0.0).unwrap();
        let tilted = rig.render_sprite(MouthState::Closed, EyeState::Neutral, 8.0).unwrap();
        assert_ne!(straight.data(), tilted.data());
        // Bottom row belongs to the static torso
        let row = (183 * 160 * 4) as usize;
        assert_eq!(&straight.data()[row..], &tilted.data()[row..]);
    }

    #[test]
    fn test_fingerprint_tracks_accessories() {
        let plain = CharacterRig::new(100, 115);
        let dressed = CharacterRig::new(100, 115).with_accessories([2, 0]);
        assert!(plain.fingerprint().starts_with("rig_100x115_acc-plain_pal-"));
        assert!(dressed.fingerprint().starts_with("rig_100x115_acc-0-2_pal-"));
    }

    #[test]
    fn test_fingerprint_tracks_palette() {
        let stock = CharacterRig::new(100, 115);
        let mut recoloured = CharacterRig::new(100, 115);
        recoloured.palette.tie = Color::from_rgba8(20, 120, 60, 255);
        assert_ne!(stock.fingerprint(), recoloured.fingerprint());
        assert_eq!(stock.fingerprint(), CharacterRig::new(100, 115).fingerprint());
        assert_eq!(stock.palette.digest().len(), 8);
    }
}
