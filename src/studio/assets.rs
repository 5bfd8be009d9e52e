// NEWSREEL Studio Assets
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Loaded once per process and passed by reference to the composer and the
// frame library. Every role is optional: a missing or broken file means the
// composer draws its built-in default for that role.
//
// Layout under the asset root:
//   studio/{background,desk,props,logo}.{png,jpg,jpeg,svg}
//   fonts/anchor.ttf
//   sfx/... (see video::sound_effects)

use resvg::usvg;
use std::fs;
use std::path::{Path, PathBuf};
use tiny_skia::{IntSize, Pixmap};
use tracing::{debug, info, warn};

use crate::animation::character::CharacterRig;
use crate::animation::text::TextPainter;
use crate::error::{NewsreelError, Result};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "svg"];
const FONT_FILE: &str = "fonts/anchor.ttf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRole {
    Background,
    Desk,
    Props,
    Logo,
}

impl AssetRole {
    pub const ALL: [AssetRole; 4] = [Self::Background, Self::Desk, Self::Props, Self::Logo];

    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Desk => "desk",
            Self::Props => "props",
            Self::Logo => "logo",
        }
    }
}

pub struct AssetBundle {
    pub root: PathBuf,
    pub background: Option<Pixmap>,
    pub desk: Option<Pixmap>,
    pub props: Option<Pixmap>,
    pub logo: Option<Pixmap>,
    pub font: Option<TextPainter>,
    pub character: CharacterRig,
}

impl AssetBundle {
    /// Bundle with no custom files: everything is drawn programmatically.
    pub fn builtin(width: u32, height: u32) -> Self {
        Self {
            root: PathBuf::new(),
            background: None,
            desk: None,
            props: None,
            logo: None,
            font: None,
            character: CharacterRig::for_frame(width, height).with_accessories([0]),
        }
    }

    pub fn load(root: &Path, width: u32, height: u32) -> Self {
        let mut bundle = Self::builtin(width, height);
        bundle.root = root.to_path_buf();

        for role in AssetRole::ALL {
            let image = load_role(root, role);
            match role {
                AssetRole::Background => bundle.background = image,
                AssetRole::Desk => bundle.desk = image,
                AssetRole::Props => bundle.props = image,
                AssetRole::Logo => bundle.logo = image,
            }
        }

        let font_path = root.join(FONT_FILE);
        if font_path.exists() {
            match TextPainter::load(&font_path) {
                Ok(font) => bundle.font = Some(font),
                Err(e) => warn!("[ASSETS] ⚠️ Font {:?} unusable ({}), drawing text placeholders", font_path, e),
            }
        } else {
            debug!("[ASSETS] No font at {:?}, drawing text placeholders", font_path);
        }

        info!(
            "[ASSETS] Loaded from {:?}: background={} desk={} props={} logo={} font={}",
            root,
            bundle.background.is_some(),
            bundle.desk.is_some(),
            bundle.props.is_some(),
            bundle.logo.is_some(),
            bundle.font.is_some()
        );
        bundle
    }

    pub fn get(&self, role: AssetRole) -> Option<&Pixmap> {
        match role {
            AssetRole::Background => self.background.as_ref(),
            AssetRole::Desk => self.desk.as_ref(),
            AssetRole::Props => self.props.as_ref(),
            AssetRole::Logo => self.logo.as_ref(),
        }
    }
}

fn load_role(root: &Path, role: AssetRole) -> Option<Pixmap> {
    let studio = root.join("studio");
    let path = IMAGE_EXTENSIONS
        .iter()
        .map(|ext| studio.join(format!("{}.{}", role.file_stem(), ext)))
        .find(|p| p.exists());

    let Some(path) = path else {
        debug!("[ASSETS] No custom {} asset, using default", role.file_stem());
        return None;
    };

    match load_image(&path) {
        Ok(pixmap) => Some(pixmap),
        Err(e) => {
            warn!("[ASSETS] ⚠️ Failed to decode {:?}: {}. Using default {}.", path, e, role.file_stem());
            None
        }
    }
}

/// Decode a raster or SVG file into a premultiplied pixmap.
pub fn load_image(path: &Path) -> Result<Pixmap> {
    let is_svg = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);
    let bytes = fs::read(path)?;
    if is_svg {
        rasterize_svg(&bytes)
    } else {
        decode_raster(&bytes)
    }
}

pub fn decode_raster(bytes: &[u8]) -> Result<Pixmap> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u32;
        for c in &mut px[..3] {
            *c = (*c as u32 * a / 255) as u8;
        }
    }
    pixmap_from_premultiplied(data, width, height)
}

fn rasterize_svg(bytes: &[u8]) -> Result<Pixmap> {
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opt)
        .map_err(|e| NewsreelError::Asset(format!("invalid SVG: {}", e)))?;
    let size = tree.size.to_screen_size();

    let mut target = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| NewsreelError::Asset("SVG has zero size".to_string()))?;
    resvg::render(
        &tree,
        usvg::FitTo::Original,
        resvg::tiny_skia::Transform::default(),
        target.as_mut(),
    )
    .ok_or_else(|| NewsreelError::Asset("SVG render failed".to_string()))?;

    pixmap_from_premultiplied(target.data().to_vec(), size.width(), size.height())
}

fn pixmap_from_premultiplied(data: Vec<u8>, width: u32, height: u32) -> Result<Pixmap> {
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| NewsreelError::Asset(format!("invalid image size {}x{}", width, height)))?;
    Pixmap::from_vec(data, size).ok_or_else(|| NewsreelError::Asset("pixel buffer size mismatch".to_string()))
}
