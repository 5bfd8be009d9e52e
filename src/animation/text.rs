// NEWSREEL Text Painter
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL

use fontdue::layout::{
    CoordinateSystem, HorizontalAlign, Layout, LayoutSettings, TextStyle, VerticalAlign, WrapStyle,
};
use fontdue::{Font, FontSettings};
use std::fs;
use std::path::Path;
use tiny_skia::Pixmap;

use crate::error::{NewsreelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Text block placement inside a pixmap.
#[derive(Debug, Clone, Copy)]
pub struct TextBox {
    pub x: f32,
    pub y: f32,
    pub max_width: f32,
    pub max_height: Option<f32>,
    pub size: f32,
    pub align: Align,
}

pub struct TextPainter {
    font: Font,
}

impl TextPainter {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| NewsreelError::Asset(format!("failed to parse font: {}", e)))?;
        Ok(Self { font })
    }

    /// Draws wrapped text and returns the laid-out height.
    pub fn draw(&self, pixmap: &mut Pixmap, text: &str, area: TextBox, rgba: [u8; 4]) -> f32 {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: area.x,
            y: area.y,
            max_width: Some(area.max_width),
            max_height: area.max_height,
            horizontal_align: match area.align {
                Align::Left => HorizontalAlign::Left,
                Align::Center => HorizontalAlign::Center,
            },
            vertical_align: VerticalAlign::Top,
            wrap_style: WrapStyle::Word,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, area.size, 0));

        let width = pixmap.width() as i32;
        let height = pixmap.height() as i32;
        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (_, coverage) = self.font.rasterize_config(glyph.key);
            blend_coverage(
                pixmap.data_mut(),
                width,
                height,
                glyph.x.round() as i32,
                glyph.y.round() as i32,
                glyph.width,
                &coverage,
                rgba,
            );
        }
        layout.height()
    }
}

/// Source-over blend of an 8-bit coverage mask into premultiplied RGBA.
fn blend_coverage(
    data: &mut [u8],
    width: i32,
    height: i32,
    x0: i32,
    y0: i32,
    mask_width: usize,
    coverage: &[u8],
    rgba: [u8; 4],
) {
    if mask_width == 0 {
        return;
    }
    for (row, line) in coverage.chunks(mask_width).enumerate() {
        let y = y0 + row as i32;
        if y < 0 || y >= height {
            continue;
        }
        for (col, &c) in line.iter().enumerate() {
            let x = x0 + col as i32;
            if x < 0 || x >= width || c == 0 {
                continue;
            }
            let sa = rgba[3] as u32 * c as u32 / 255;
            let inv = 255 - sa;
            let i = ((y * width + x) * 4) as usize;
            for ch in 0..3 {
                let src = rgba[ch] as u32 * sa / 255;
                data[i + ch] = (src + data[i + ch] as u32 * inv / 255) as u8;
            }
            data[i + 3] = (sa + data[i + 3] as u32 * inv / 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_full_coverage_replaces_pixel() {
        let mut data = vec![0u8; 2 * 2 * 4];
        blend_coverage(&mut data, 2, 2, 1, 1, 1, &[255], [200, 100, 50, 255]);
        assert_eq!(&data[12..16], &[200, 100, 50, 255]);
        assert_eq!(&data[0..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_blend_clips_outside_canvas() {
        let mut data = vec![0u8; 2 * 2 * 4];
        blend_coverage(&mut data, 2, 2, -1, -1, 2, &[255, 255, 255, 255], [255, 255, 255, 255]);
        assert_eq!(&data[0..4], &[255, 255, 255, 255]);
        assert_eq!(&data[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_partial_coverage_stays_premultiplied() {
        let mut data = vec![10, 10, 10, 255];
        blend_coverage(&mut data, 1, 1, 0, 0, 1, &[128], [255, 0, 0, 255]);
        assert!(data[0] <= data[3] && data[1] <= data[3]);
        assert_eq!(data[3], 255);
    }

    #[test]
    fn test_garbage_font_is_rejected() {
        assert!(TextPainter::from_bytes(vec![0, 1, 2, 3]).is_err());
    }
}
