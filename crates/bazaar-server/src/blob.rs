//! Blob store for uploaded product images.
//!
//! Stored blobs are referenced by a relative path (`uploads/<name>`), which
//! is what the catalog keeps in `products.image`.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, instrument};

/// URL prefix of stored blobs, also the first segment of every reference.
pub const UPLOADS_PREFIX: &str = "uploads";

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "LPT1", "LPT2", "LPT3",
];

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist an upload. An empty `original_filename` means no file was
    /// chosen, and yields `None`.
    async fn store(&self, bytes: &[u8], original_filename: &str)
    -> Result<Option<String>, BlobError>;
}

/// Writes blobs into a directory on the local filesystem.
///
/// Two uploads that sanitise to the same name overwrite each other.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn store(
        &self,
        bytes: &[u8],
        original_filename: &str,
    ) -> Result<Option<String>, BlobError> {
        if original_filename.is_empty() {
            return Ok(None);
        }

        let mut name = secure_filename(original_filename);
        if name.is_empty() {
            name = format!("upload-{}", uuid::Uuid::new_v4().simple());
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| BlobError::Io {
                path: self.root.clone(),
                source,
            })?;

        let path = self.root.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| BlobError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "Blob stored");
        Ok(Some(format!("{UPLOADS_PREFIX}/{name}")))
    }
}

/// Reduce a client-supplied filename to a safe, flat ASCII name.
///
/// Non-ASCII characters are dropped, path separators become spaces, runs of
/// whitespace collapse to `_`, and only `[A-Za-z0-9._-]` survives. Leading
/// and trailing `.` and `_` are stripped. The result may be empty.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let name = kept.trim_matches(|c| c == '.' || c == '_').to_string();

    let stem = name.split('.').next().unwrap_or_default().to_ascii_uppercase();
    if WINDOWS_DEVICE_NAMES.contains(&stem.as_str()) {
        return format!("_{name}");
    }

    name
}
