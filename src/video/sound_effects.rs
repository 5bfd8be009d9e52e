// NEWSREEL Sound Effects
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Short stings layered over the speech track. Files are resolved under
// <asset root>/sfx:
//   intro.*  transition.*  category/<category slug>.*  outro.*

use std::path::{Path, PathBuf};
use tracing::{debug, info};

const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "wav", "ogg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StingKind {
    Intro,
    Transition,
    Category,
    Outro,
}

/// Offset rule: `fraction` of the duration, clamped to `[min_secs, max_secs]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StingTiming {
    pub fraction: f64,
    pub min_secs: f64,
    pub max_secs: f64,
}

impl StingKind {
    pub const ALL: [StingKind; 4] = [Self::Intro, Self::Transition, Self::Category, Self::Outro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Transition => "transition",
            Self::Category => "category",
            Self::Outro => "outro",
        }
    }

    pub fn timing(&self, is_short_format: bool) -> StingTiming {
        let (fraction, min_secs, max_secs) = match (self, is_short_format) {
            (Self::Intro, _) => (0.0, 0.0, 0.0),
            (Self::Transition, false) => (0.25, 3.0, 10.0),
            (Self::Transition, true) => (0.20, 1.5, 3.0),
            (Self::Category, false) => (0.45, 6.0, 20.0),
            (Self::Category, true) => (0.40, 2.5, 6.0),
            (Self::Outro, false) => (0.90, 5.0, 60.0),
            (Self::Outro, true) => (0.88, 3.0, 14.0),
        };
        StingTiming {
            fraction,
            min_secs,
            max_secs,
        }
    }

    pub fn volume(&self) -> f32 {
        match self {
            Self::Intro => 0.50,
            Self::Transition => 0.35,
            Self::Category => 0.45,
            Self::Outro => 0.50,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sting {
    pub kind: StingKind,
    pub path: PathBuf,
    pub offset_secs: f64,
    pub volume: f32,
}

impl Sting {
    pub fn offset_ms(&self) -> u64 {
        (self.offset_secs.max(0.0) * 1000.0).round() as u64
    }
}

/// Start time for a sting of `kind` in a video of `duration` seconds.
pub fn offset_for(kind: StingKind, duration: f64, is_short_format: bool) -> f64 {
    let timing = kind.timing(is_short_format);
    let raw = (duration * timing.fraction).clamp(timing.min_secs, timing.max_secs);
    raw.clamp(0.0, (duration - 1.0).max(0.0))
}

/// `Lifestyle & Weird` -> `lifestyle-weird`
pub fn category_slug(category: &str) -> String {
    let mut slug = String::new();
    for ch in category.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[derive(Debug, Clone)]
pub struct StingLibrary {
    root: PathBuf,
}

impl StingLibrary {
    pub fn new(asset_root: &Path) -> Self {
        Self {
            root: asset_root.join("sfx"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, kind: StingKind, category: &str) -> Option<PathBuf> {
        let stem = match kind {
            StingKind::Category => {
                let slug = category_slug(category);
                if slug.is_empty() {
                    return None;
                }
                self.root.join("category").join(slug)
            }
            other => self.root.join(other.as_str()),
        };
        AUDIO_EXTENSIONS
            .iter()
            .map(|ext| stem.with_extension(ext))
            .find(|p| p.is_file())
    }

    /// Stings that have a file, with offsets and volumes filled in.
    pub fn plan(&self, category: &str, duration: f64, is_short_format: bool) -> Vec<Sting> {
        let stings: Vec<Sting> = StingKind::ALL
            .iter()
            .filter_map(|&kind| {
                let path = self.resolve(kind, category);
                if path.is_none() {
                    debug!("[SFX] No {} sting under {:?}", kind.as_str(), self.root);
                }
                path.map(|path| Sting {
                    kind,
                    path,
                    offset_secs: offset_for(kind, duration, is_short_format),
                    volume: kind.volume(),
                })
            })
            .collect();
        info!("[SFX] Planned {} stings for {:.1}s video", stings.len(), duration);
        stings
    }
}

/// `filter_complex` mixing stings (inputs 1..=n) into the video's audio (input 0).
pub fn build_mix_graph(stings: &[Sting]) -> String {
    let mut graph = String::new();
    let mut labels = String::from("[0:a]");
    for (i, sting) in stings.iter().enumerate() {
        graph.push_str(&format!(
            "[{}:a]adelay=delays={}:all=1,volume={:.2}[s{}];",
            i + 1,
            sting.offset_ms(),
            sting.volume,
            i
        ));
        labels.push_str(&format!("[s{}]", i));
    }
    graph.push_str(&format!(
        "{}amix=inputs={}:duration=first:normalize=0[aout]",
        labels,
        stings.len() + 1
    ));
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_standard_offsets() {
        assert!(approx(offset_for(StingKind::Intro, 30.0, false), 0.0));
        assert!(approx(offset_for(StingKind::Transition, 30.0, false), 7.5));
        assert!(approx(offset_for(StingKind::Transition, 8.0, false), 3.0));
        assert!(approx(offset_for(StingKind::Category, 100.0, false), 20.0));
        assert!(approx(offset_for(StingKind::Outro, 30.0, false), 27.0));
        assert!(approx(offset_for(StingKind::Outro, 120.0, false), 60.0));
    }

    #[test]
    fn test_short_offsets() {
        assert!(approx(offset_for(StingKind::Transition, 12.0, true), 2.4));
        assert!(approx(offset_for(StingKind::Transition, 5.0, true), 1.5));
        assert!(approx(offset_for(StingKind::Category, 10.0, true), 4.0));
        assert!(approx(offset_for(StingKind::Outro, 10.0, true), 8.8));
        assert!(approx(offset_for(StingKind::Outro, 15.0, true), 13.2));
    }

    #[test]
    fn test_offsets_stay_inside_video() {
        // Outro minimum of 3s exceeds a 2s clip, so it lands one second before the end
        assert!(approx(offset_for(StingKind::Outro, 2.0, true), 1.0));
        assert!(approx(offset_for(StingKind::Category, 0.5, false), 0.0));
        for kind in StingKind::ALL {
            for duration in [0.0, 1.0, 3.3, 14.0, 44.0, 300.0] {
                let offset = offset_for(kind, duration, duration <= 15.0);
                assert!(offset >= 0.0 && offset <= (duration - 1.0).max(0.0));
            }
        }
    }

    #[test]
    fn test_slug() {
        assert_eq!(category_slug("Lifestyle & Weird"), "lifestyle-weird");
        assert_eq!(category_slug("  Animals "), "animals");
        assert_eq!(category_slug("!!!"), "");
    }

    #[test]
    fn test_library_resolves_present_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let sfx = dir.path().join("sfx");
        fs::create_dir_all(sfx.join("category")).unwrap();
        fs::write(sfx.join("intro.wav"), b"x").unwrap();
        fs::write(sfx.join("category/science.mp3"), b"x").unwrap();

        let library = StingLibrary::new(dir.path());
        let plan = library.plan("Science", 30.0, false);
        let kinds: Vec<StingKind> = plan.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StingKind::Intro, StingKind::Category]);
        assert!(approx(plan[1].offset_secs, 13.5));
        assert_eq!(plan[1].volume, 0.45);

        assert!(library.plan("Sports", 30.0, false).iter().all(|s| s.kind != StingKind::Category));
    }

    #[test]
    fn test_mix_graph() {
        let stings = vec![
            Sting {
                kind: StingKind::Intro,
                path: PathBuf::from("intro.wav"),
                offset_secs: 0.0,
                volume: 0.5,
            },
            Sting {
                kind: StingKind::Outro,
                path: PathBuf::from("outro.wav"),
                offset_secs: 27.0,
                volume: 0.5,
            },
        ];
        assert_eq!(
            build_mix_graph(&stings),
            "[1:a]adelay=delays=0:all=1,volume=0.50[s0];\
             [2:a]adelay=delays=27000:all=1,volume=0.50[s1];\
             [0:a][s0][s1]amix=inputs=3:duration=first:normalize=0[aout]"
        );
    }
}
