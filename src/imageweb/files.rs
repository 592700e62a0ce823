//! Files picked by the user, and the transient preview URLs shown for them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use tracing::debug;

/// A file chosen in a file input: name, MIME type and contents.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk, guessing its MIME type from the extension.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, mime, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Encodes a file as a data URL off the async threads. A file without contents cannot be read.
pub async fn read_as_data_url(file: SelectedFile) -> Result<String> {
    let name = file.name.clone();
    if file.is_empty() {
        anyhow::bail!("Не удалось прочитать файл {}", name);
    }
    let url = tokio::task::spawn_blocking(move || file.to_data_url())
        .await
        .with_context(|| format!("Reading {} was cancelled", name))?;
    debug!("Read {} as data URL ({} chars)", name, url.len());
    Ok(url)
}

/// Formats the link store accepts.
pub fn is_uploadable_image(mime: &str) -> bool {
    matches!(
        mime,
        "image/png" | "image/jpeg" | "image/jpg" | "image/gif" | "image/webp"
    )
}

/// Issues `blob:` URLs for previews and tracks which are still live.
#[derive(Debug, Default)]
pub struct PreviewUrls {
    live: HashSet<String>,
}

impl PreviewUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, file: &SelectedFile) -> String {
        let url = format!("blob:{}", uuid::Uuid::new_v4());
        debug!("Preview {} for {}", url, file.name);
        self.live.insert(url.clone());
        url
    }

    /// Returns false when the URL was never issued or is already revoked.
    pub fn revoke(&mut self, url: &str) -> bool {
        self.live.remove(url)
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live.contains(url)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
