// NEWSREEL Retention Sweep
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Deletes intermediate files (frame sequences, subtitle files, downloaded
// images) older than the retention age, then prunes emptied directories.
// Sweep roots themselves are never removed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub bytes_freed: u64,
}

impl CleanupReport {
    fn absorb(&mut self, other: CleanupReport) {
        self.files_removed += other.files_removed;
        self.dirs_removed += other.dirs_removed;
        self.bytes_freed += other.bytes_freed;
    }
}

pub fn sweep(roots: &[PathBuf], max_age: Duration) -> CleanupReport {
    let now = SystemTime::now();
    let mut report = CleanupReport::default();
    for root in roots {
        if !root.is_dir() {
            debug!("[CLEANUP] Skipping missing {:?}", root);
            continue;
        }
        report.absorb(sweep_root(root, max_age, now));
    }
    info!(
        "[CLEANUP] 🧹 Removed {} files and {} directories ({:.2} MB)",
        report.files_removed,
        report.dirs_removed,
        report.bytes_freed as f64 / 1_048_576.0
    );
    report
}

fn sweep_root(root: &Path, max_age: Duration, now: SystemTime) -> CleanupReport {
    let mut report = CleanupReport::default();

    for entry in WalkDir::new(root).min_depth(1).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or(Duration::ZERO);
        if age < max_age {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                report.files_removed += 1;
                report.bytes_freed += meta.len();
            }
            Err(e) => warn!("[CLEANUP] Could not remove {:?}: {}", entry.path(), e),
        }
    }

    // Children before parents so nested empty directories collapse
    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir() && is_empty_dir(entry.path()) && fs::remove_dir(entry.path()).is_ok() {
            report.dirs_removed += 1;
        }
    }
    report
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
