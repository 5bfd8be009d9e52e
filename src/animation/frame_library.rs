// NEWSREEL Frame Library
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Pre-rendered anchor sprites for every (mouth, eye, rotation) triple.
// Sprites live in memory for the process and on disk across runs:
//   <cache_dir>/<rig fingerprint>/<mouth>_<eye>_r<rotation>.png

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tiny_skia::Pixmap;
use tracing::{debug, info, warn};

use crate::animation::character::CharacterRig;
use crate::animation::state::{EyeState, MouthState};
use crate::error::{NewsreelError, Result};
use crate::studio::assets::AssetBundle;

/// Sorted set of head-tilt angles with a pre-rendered sprite.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationLattice {
    points: Vec<f32>,
}

impl RotationLattice {
    pub fn new(mut points: Vec<f32>) -> Result<Self> {
        if points.is_empty() || points.iter().any(|p| !p.is_finite()) {
            return Err(NewsreelError::InvalidInput(
                "rotation lattice needs at least one finite angle".to_string(),
            ));
        }
        points.sort_by(|a, b| a.total_cmp(b));
        points.dedup();
        Ok(Self { points })
    }

    /// -8..=8 in 2 degree steps.
    pub fn coarse() -> Self {
        Self {
            points: (-4..=4).map(|i| i as f32 * 2.0).collect(),
        }
    }

    /// -8..=8 in 1 degree steps.
    pub fn fine() -> Self {
        Self {
            points: (-8..=8).map(|i| i as f32).collect(),
        }
    }

    pub fn points(&self) -> &[f32] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn degrees(&self, index: usize) -> Option<f32> {
        self.points.get(index).copied()
    }

    /// Closest lattice point; on a tie the earlier (lower) point wins.
    pub fn nearest_index(&self, degrees: f32) -> usize {
        let target = if degrees.is_finite() { degrees } else { 0.0 };
        let mut best = 0;
        for (i, point) in self.points.iter().enumerate().skip(1) {
            if (point - target).abs() < (self.points[best] - target).abs() {
                best = i;
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub mouth: MouthState,
    pub eye: EyeState,
    pub rotation_index: usize,
}

impl FrameKey {
    pub fn file_name(&self, lattice: &RotationLattice) -> String {
        let degrees = lattice.degrees(self.rotation_index).unwrap_or(0.0);
        let tenths = (degrees * 10.0).round() as i32;
        format!("{}_{}_r{:+04}.png", self.mouth.as_str(), self.eye.as_str(), tenths)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryStats {
    /// Sprites drawn (and written to disk) by this instance.
    pub rendered: usize,
    /// Sprites read back from the disk cache.
    pub loaded: usize,
}

pub struct FrameLibrary {
    cache_root: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    lattice: RotationLattice,
    sprites: HashMap<FrameKey, Pixmap>,
    initialized: bool,
    stats: LibraryStats,
}

impl FrameLibrary {
    /// `cache_root` of `None` keeps sprites in memory only.
    pub fn new(cache_root: Option<PathBuf>) -> Self {
        Self {
            cache_root,
            cache_dir: None,
            lattice: RotationLattice::coarse(),
            sprites: HashMap::new(),
            initialized: false,
            stats: LibraryStats::default(),
        }
    }

    pub fn initialize(&mut self, assets: &AssetBundle, use_finer_rotation_lattice: bool) -> Result<()> {
        let lattice = if use_finer_rotation_lattice {
            RotationLattice::fine()
        } else {
            RotationLattice::coarse()
        };
        self.initialize_with_lattice(&assets.character, lattice)
    }

    pub fn initialize_with_lattice(&mut self, rig: &CharacterRig, lattice: RotationLattice) -> Result<()> {
        if self.initialized {
            debug!("[LIBRARY] Already initialized ({} sprites)", self.sprites.len());
            return Ok(());
        }

        let cache_dir = match &self.cache_root {
            Some(root) => {
                let dir = root.join(rig.fingerprint());
                fs::create_dir_all(&dir)?;
                Some(dir)
            }
            None => None,
        };

        info!(
            "[LIBRARY] Building {} sprites ({} mouths x {} eyes x {} rotations)",
            MouthState::ALL.len() * EyeState::ALL.len() * lattice.len(),
            MouthState::ALL.len(),
            EyeState::ALL.len(),
            lattice.len()
        );

        let mut sprites = HashMap::new();
        let mut stats = self.stats;

        for mouth in MouthState::ALL {
            for eye in EyeState::ALL {
                for (rotation_index, &degrees) in lattice.points().iter().enumerate() {
                    let key = FrameKey { mouth, eye, rotation_index };
                    let cached = cache_dir.as_ref().map(|dir| dir.join(key.file_name(&lattice)));

                    if let Some(sprite) = cached.as_deref().and_then(load_cached) {
                        stats.loaded += 1;
                        sprites.insert(key, sprite);
                        continue;
                    }

                    let sprite = rig.render_sprite(mouth, eye, degrees)?;
                    if let Some(path) = &cached {
                        if let Err(e) = sprite.save_png(path) {
                            warn!("[LIBRARY] Could not persist sprite {:?}: {}", path, e);
                        }
                    }
                    stats.rendered += 1;
                    sprites.insert(key, sprite);
                }
            }
        }

        info!(
            "[LIBRARY] ✅ Ready: {} rendered, {} loaded from cache",
            stats.rendered - self.stats.rendered,
            stats.loaded - self.stats.loaded
        );

        self.sprites = sprites;
        self.lattice = lattice;
        self.cache_dir = cache_dir;
        self.stats = stats;
        self.initialized = true;
        Ok(())
    }

    /// Sprite for the closest cached rotation.
    pub fn get_frame(&self, mouth: MouthState, eye: EyeState, rotation: f32) -> Option<&Pixmap> {
        if !self.initialized {
            return None;
        }
        let key = FrameKey {
            mouth,
            eye,
            rotation_index: self.lattice.nearest_index(rotation),
        };
        self.sprites.get(&key)
    }

    /// Drops in-memory sprites; the disk cache is untouched.
    pub fn clear_memory(&mut self) {
        info!("[LIBRARY] Releasing {} in-memory sprites", self.sprites.len());
        self.sprites.clear();
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn lattice(&self) -> &RotationLattice {
        &self.lattice
    }

    pub fn stats(&self) -> LibraryStats {
        self.stats
    }

    /// Directory holding this rig's sprites, once initialized.
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }
}

fn load_cached(path: &Path) -> Option<Pixmap> {
    if !path.exists() {
        return None;
    }
    match Pixmap::load_png(path) {
        Ok(sprite) => Some(sprite),
        Err(e) => {
            warn!("[LIBRARY] Corrupt cached sprite {:?} ({}), re-rendering", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_rig() -> CharacterRig {
        CharacterRig::new(40, 46)
    }

    #[test]
    fn test_nearest_rotation_on_custom_lattice() {
        let lattice = RotationLattice::new(vec![-4.0, -2.0, 0.0, 2.0, 4.0]).unwrap();
        assert_eq!(lattice.degrees(lattice.nearest_index(5.5)), Some(4.0));
        assert_eq!(lattice.degrees(lattice.nearest_index(-0.4)), Some(0.0));
        assert_eq!(lattice.degrees(lattice.nearest_index(-180.0)), Some(-4.0));
        // Tie between 0 and 2 keeps the first point
        assert_eq!(lattice.degrees(lattice.nearest_index(1.0)), Some(0.0));
    }

    #[test]
    fn test_lattice_rejects_empty() {
        assert!(RotationLattice::new(vec![]).is_err());
        assert!(RotationLattice::new(vec![f32::NAN]).is_err());
        let sorted = RotationLattice::new(vec![2.0, -2.0, 2.0]).unwrap();
        assert_eq!(sorted.points(), &[-2.0, 2.0]);
    }

    #[test]
    fn test_key_file_names_are_distinct() {
        let lattice = RotationLattice::coarse();
        let mut names = std::collections::HashSet::new();
        for mouth in MouthState::ALL {
            for eye in EyeState::ALL {
                for rotation_index in 0..lattice.len() {
                    names.insert(FrameKey { mouth, eye, rotation_index }.file_name(&lattice));
                }
            }
        }
        assert_eq!(names.len(), 3 * 5 * 9);
        let key = FrameKey { mouth: MouthState::Open, eye: EyeState::Wink, rotation_index: 0 };
        assert_eq!(key.file_name(&lattice), "open_wink_r-080.png");
    }

    #[test]
    fn test_every_pair_resolves_for_any_rotation() {
        let mut library = FrameLibrary::new(None);
        library
            .initialize_with_lattice(&small_rig(), RotationLattice::coarse())
            .unwrap();
        assert_eq!(library.len(), 135);

        for mouth in MouthState::ALL {
            for eye in EyeState::ALL {
                let mut rotation = -180.0_f32;
                while rotation <= 180.0 {
                    assert!(library.get_frame(mouth, eye, rotation).is_some());
                    rotation += 7.25;
                }
            }
        }
    }

    #[test]
    fn test_uninitialized_and_cleared_library_misses() {
        let mut library = FrameLibrary::new(None);
        assert!(library.get_frame(MouthState::Open, EyeState::Neutral, 0.0).is_none());

        library
            .initialize_with_lattice(&small_rig(), RotationLattice::new(vec![0.0]).unwrap())
            .unwrap();
        assert!(library.get_frame(MouthState::Open, EyeState::Neutral, 3.0).is_some());

        library.clear_memory();
        assert!(!library.is_initialized());
        assert!(library.get_frame(MouthState::Open, EyeState::Neutral, 0.0).is_none());
    }

    #[test]
    fn test_second_initialize_is_noop() {
        let mut library = FrameLibrary::new(None);
        let rig = small_rig();
        library.initialize_with_lattice(&rig, RotationLattice::coarse()).unwrap();
        let first = library.stats();
        library.initialize_with_lattice(&rig, RotationLattice::fine()).unwrap();
        assert_eq!(library.stats(), first);
        assert_eq!(library.lattice(), &RotationLattice::coarse());
    }
}
