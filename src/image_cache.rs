use image::ImageFormat;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::fetcher::HttpFetcher;
use crate::utils::error::{AppError, Result};

const KNOWN_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Product images persisted in a local directory, one file per product key.
#[derive(Debug, Clone)]
pub struct ImageCache {
    directory: PathBuf,
}

impl ImageCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<PathBuf> {
        let stem = sanitize_key(key);

        for ext in KNOWN_EXTENSIONS {
            let path = self.directory.join(format!("{}.{}", stem, ext));
            if tokio::fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
                return Some(path);
            }
        }

        None
    }

    /// Store image bytes under `key`. Writes go to a temporary file that is
    /// renamed into place, so concurrent puts of the same key leave one whole file.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let format = image::guess_format(bytes)
            .map_err(|e| AppError::ImageCache(format!("unrecognised image data for '{}': {}", key, e)))?;
        let ext = match format {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            other => {
                return Err(AppError::ImageCache(format!(
                    "unsupported image format {:?} for '{}'",
                    other, key
                )));
            }
        };

        tokio::fs::create_dir_all(&self.directory).await?;

        let path = self.directory.join(format!("{}.{}", sanitize_key(key), ext));
        let tmp = self.directory.join(format!(".{}.tmp", Uuid::new_v4()));

        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(key, path = %path.display(), bytes = bytes.len(), "Cached product image");
        Ok(path)
    }

    pub async fn get_or_fetch(&self, key: &str, url: &str, fetcher: &HttpFetcher) -> Result<PathBuf> {
        if let Some(path) = self.get(key).await {
            return Ok(path);
        }

        let bytes = fetcher.fetch_bytes(url).await?;
        self.put(key, &bytes).await
    }
}

fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if cleaned.is_empty() { "image".to_string() } else { cleaned }
}

/// Content type for an attachment, from the cached file's extension.
pub fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
