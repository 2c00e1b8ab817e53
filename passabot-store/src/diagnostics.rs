//! Diagnostic artifacts.
//!
//! When the portal answers with an unexpected status the raw body is kept
//! on disk so the operator can inspect it later. Failed login ceremonies
//! leave a screenshot next to it.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::error::StoreError;
use crate::persistence::{ensure_dir, set_restrictive_permissions};

/// Writes timestamped diagnostic files into a directory.
#[derive(Debug, Clone)]
pub struct DiagnosticStore {
    dir: PathBuf,
}

impl DiagnosticStore {
    /// Creates a store rooted at `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the artifacts go into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves an upstream response body and returns its path.
    #[instrument(skip(self, body), fields(len = body.len()))]
    pub async fn write_upstream_body(&self, body: &str) -> Result<PathBuf, StoreError> {
        let path = self.next_path("upstream", "txt");
        self.write(&path, body.as_bytes()).await?;
        info!(path = %path.display(), "Saved upstream response body");
        Ok(path)
    }

    /// Saves a PNG screenshot and returns its path.
    #[instrument(skip(self, png), fields(len = png.len()))]
    pub async fn write_screenshot(&self, label: &str, png: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.next_path(label, "png");
        self.write(&path, png).await?;
        info!(path = %path.display(), "Saved screenshot");
        Ok(path)
    }

    fn next_path(&self, label: &str, extension: &str) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        self.dir.join(format!("{label}-{stamp}.{extension}"))
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        ensure_dir(&self.dir).await?;
        tokio::fs::write(path, bytes).await?;
        set_restrictive_permissions(path).await?;
        Ok(())
    }
}
