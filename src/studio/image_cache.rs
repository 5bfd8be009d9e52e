// NEWSREEL Image Cache
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Footer images for news items. Files are kept on disk under
// sha256(url).<ext>; at most `capacity` decoded images stay in memory and the
// oldest entry is evicted first. Disk files are expired by the retention sweep.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tiny_skia::Pixmap;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{NewsreelError, Result};
use crate::studio::assets::decode_raster;

pub const DEFAULT_CAPACITY: usize = 16;
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);
const KNOWN_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

pub struct ImageCache {
    dir: PathBuf,
    capacity: usize,
    client: reqwest::Client,
    entries: HashMap<String, Pixmap>,
    order: VecDeque<String>,
}

impl ImageCache {
    pub fn new(dir: PathBuf, capacity: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("newsreel-core/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            dir,
            capacity: capacity.max(1),
            client,
            entries: HashMap::new(),
            order: VecDeque::new(),
        })
    }

    /// Image for `url`, or `None` with a warning on any failure.
    pub async fn footer_image(&mut self, url: &str) -> Option<Pixmap> {
        match self.fetch(url).await {
            Ok(pixmap) => Some(pixmap),
            Err(e) => {
                warn!("[IMAGES] ⚠️ No footer image for {}: {}", url, e);
                None
            }
        }
    }

    pub async fn fetch(&mut self, url: &str) -> Result<Pixmap> {
        let parsed = validate_url(url)?;
        if let Some(hit) = self.entries.get(url) {
            debug!("[IMAGES] Memory hit for {}", url);
            return Ok(hit.clone());
        }

        let path = self.dir.join(cache_file_name(&parsed));
        let pixmap = match read_cached(&path) {
            Some(pixmap) => {
                debug!("[IMAGES] Disk hit {:?}", path);
                pixmap
            }
            None => self.download(&parsed, &path).await?,
        };

        self.remember(url.to_string(), pixmap.clone());
        Ok(pixmap)
    }

    async fn download(&self, url: &Url, path: &Path) -> Result<Pixmap> {
        info!("[IMAGES] Downloading {}", url);
        let bytes = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        // Decode before persisting so a bad payload never lands on disk
        let pixmap = decode_raster(&bytes)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(path, &bytes)?;
        Ok(pixmap)
    }

    fn remember(&mut self, key: String, pixmap: Pixmap) {
        if self.entries.contains_key(&key) {
            return;
        }
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else { break };
            self.entries.remove(&oldest);
            debug!("[IMAGES] Evicted {}", oldest);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, pixmap);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn clear_memory(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

pub fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| NewsreelError::InvalidInput(format!("bad image url {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(NewsreelError::InvalidInput(format!("unsupported image url scheme {:?}", other))),
    }
}

pub fn cache_file_name(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    let hash: String = digest.iter().map(|b| format!("{:02x}", b)).collect();

    let ext = Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| KNOWN_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or_else(|| "img".to_string());
    format!("{}.{}", hash, ext)
}

fn read_cached(path: &Path) -> Option<Pixmap> {
    let bytes = fs::read(path).ok()?;
    match decode_raster(&bytes) {
        Ok(pixmap) => Some(pixmap),
        Err(e) => {
            warn!("[IMAGES] Discarding corrupt cache file {:?}: {}", path, e);
            let _ = fs::remove_file(path);
            None
        }
    }
}
