//! Media layer: uploaded file storage and the short-id image cache.
//!
//! `MediaStore` implements the object storage contract for cover and
//! gallery images: bytes go in, a retrievable URL comes out, progress is
//! reported as a 0-100 percentage while the write is in flight, and a
//! failed write leaves no partial file behind. `ImageCache` backs the
//! editor's inline images: data URLs are parked under short ids so the
//! authored text stays readable, and `![alt](@id)` references are expanded
//! back before rendering. Both are plain injected components with explicit
//! lifecycles.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use crate::errors::AppError;
use crate::store::LocalBucket;

/// Storage key the image cache persists under.
pub const IMAGE_CACHE_KEY: &str = "imageStorage";

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

static REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(@([^)]+)\)").expect("valid regex"));

static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^img_(\d+)_").expect("valid regex"));

/// Disk-backed storage for uploaded media files.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store `bytes` under `name`, reporting progress after every chunk.
    ///
    /// Returns the retrievable URL. On any write failure the partial file
    /// is removed and the error surfaced; no placeholder URL is produced.
    pub fn store(
        &self,
        name: &str,
        bytes: &[u8],
        mut on_progress: impl FnMut(u8),
    ) -> Result<String, AppError> {
        validate_name(name)?;
        fs::create_dir_all(&self.root)
            .map_err(|e| AppError::Media(format!("Failed to create media directory: {}", e)))?;

        let path = self.root.join(name);
        let mut file = File::create(&path)
            .map_err(|e| AppError::Media(format!("Failed to store {}: {}", name, e)))?;

        let total = bytes.len();
        let mut written = 0usize;
        for chunk in bytes.chunks(UPLOAD_CHUNK_SIZE) {
            if let Err(err) = file.write_all(chunk) {
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(AppError::Media(format!("Failed to store {}: {}", name, err)));
            }
            written += chunk.len();
            on_progress((written * 100 / total) as u8);
        }
        if total == 0 {
            on_progress(100);
        }

        Ok(format!("/media/{}", name))
    }

    /// Read a stored file back; `None` when it does not exist.
    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>, AppError> {
        validate_name(name)?;
        match fs::read(self.root.join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AppError::Media(format!("Failed to read {}: {}", name, err))),
        }
    }
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(AppError::Media(format!("Invalid media file name: {}", name)));
    }
    Ok(())
}

/// Short-id cache for editor-inlined images.
///
/// Data URLs are too bulky to keep inline in the authored text, so the
/// editor parks them here and references them as `![alt](@id)`. The whole
/// map persists under one storage key; load once at startup, save after
/// every mutation.
#[derive(Debug)]
pub struct ImageCache {
    bucket: LocalBucket,
    images: HashMap<String, String>,
    next_id: u64,
}

impl ImageCache {
    pub fn new(bucket: LocalBucket) -> Self {
        Self {
            bucket,
            images: HashMap::new(),
            next_id: 1,
        }
    }

    /// Restore persisted entries, continuing the id sequence from the
    /// highest one seen.
    pub fn load(&mut self) {
        let Some(data) = self.bucket.get(IMAGE_CACHE_KEY) else {
            return;
        };
        let entries: Vec<(String, String)> = match serde_json::from_str(&data) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("Error loading image cache: {}", err);
                return;
            }
        };

        self.images = entries.into_iter().collect();
        let max_id = self
            .images
            .keys()
            .filter_map(|id| ID_RE.captures(id))
            .filter_map(|caps| caps[1].parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        self.next_id = max_id + 1;
    }

    pub fn save(&self) {
        let entries: Vec<(&String, &String)> = self.images.iter().collect();
        match serde_json::to_string(&entries) {
            Ok(data) => {
                if let Err(err) = self.bucket.set(IMAGE_CACHE_KEY, &data) {
                    tracing::warn!("Error saving image cache: {}", err);
                }
            }
            Err(err) => tracing::warn!("Error serializing image cache: {}", err),
        }
    }

    /// Park a data URL and return its short id.
    pub fn insert(&mut self, data_url: &str) -> String {
        let id = format!("img_{}_{}", self.next_id, Utc::now().timestamp_millis());
        self.next_id += 1;
        self.images.insert(id.clone(), data_url.to_string());
        self.save();
        id
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.images.get(id).map(String::as_str)
    }

    /// Markdown reference for a parked image.
    pub fn markdown_ref(id: &str, file_name: &str) -> String {
        format!("![{}](@{})", file_name, id)
    }

    /// Replace every known `![alt](@id)` reference with its stored data
    /// URL. Unknown ids stay as-is.
    pub fn expand_refs(&self, text: &str) -> String {
        REF_RE
            .replace_all(text, |caps: &regex::Captures<'_>| {
                match self.images.get(&caps[2]) {
                    Some(url) => format!("![{}]({})", &caps[1], url),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Drop every entry whose id is not in `used`.
    pub fn cleanup_unused(&mut self, used: &[String]) {
        let before = self.images.len();
        self.images.retain(|id, _| used.contains(id));
        if self.images.len() != before {
            self.save();
        }
    }
}
