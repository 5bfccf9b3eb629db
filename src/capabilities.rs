//! Side-effect seams: clipboard, share sheet, file saving.
//!
//! The pipeline never touches these directly. Callers hand results to them
//! after processing; failures are logged and do not affect pipeline results.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), AppError>;
}

/// Native share hook. The CLI never shares; embedding hosts with a share
/// sheet implement this, others fall back to [`ClipboardShare`].
#[async_trait]
pub trait ShareSheet: Send + Sync {
    async fn share(&self, title: &str, url: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait FileSaver: Send + Sync {
    /// Persist `bytes` under `file_name`, returning where they landed.
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, AppError>;
}

// ── Clipboard ──────────────────────────────────────────────────

/// OS clipboard via `arboard`.
#[cfg(feature = "clipboard")]
#[derive(Default)]
pub struct SystemClipboard;

#[cfg(feature = "clipboard")]
impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), AppError> {
        let mut cb = arboard::Clipboard::new()
            .map_err(|e| AppError::Capability(format!("clipboard unavailable: {e}")))?;
        cb.set_text(text.to_string())
            .map_err(|e| AppError::Capability(format!("clipboard write failed: {e}")))
    }
}

/// Clipboard stand-in for headless hosts; logs the text instead.
#[derive(Default)]
pub struct LogClipboard;

impl Clipboard for LogClipboard {
    fn write_text(&self, text: &str) -> Result<(), AppError> {
        tracing::info!(text = %text, "Clipboard (headless)");
        Ok(())
    }
}

/// Best available clipboard for this build.
pub fn default_clipboard() -> Arc<dyn Clipboard> {
    #[cfg(feature = "clipboard")]
    {
        Arc::new(SystemClipboard)
    }
    #[cfg(not(feature = "clipboard"))]
    {
        Arc::new(LogClipboard)
    }
}

// ── Share ──────────────────────────────────────────────────────

/// Share sheet for hosts without a native one: copies the url instead.
pub struct ClipboardShare {
    clipboard: Arc<dyn Clipboard>,
}

impl ClipboardShare {
    pub fn new(clipboard: Arc<dyn Clipboard>) -> Self {
        Self { clipboard }
    }
}

#[async_trait]
impl ShareSheet for ClipboardShare {
    async fn share(&self, title: &str, url: &str) -> Result<(), AppError> {
        tracing::debug!(title = %title, "No native share sheet, copying url");
        self.clipboard.write_text(url)
    }
}

// ── Files ──────────────────────────────────────────────────────

/// Saves into a fixed directory, creating it on first use.
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl FileSaver for DirectorySaver {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| AppError::Validation(format!("invalid file name '{file_name}'")))?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved file");
        Ok(path)
    }
}
