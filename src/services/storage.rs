use crate::services::compression::ProcessingError;
use crate::utils::validation::sanitize_filename;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

/// A PDF persisted by the upload receiver, ready for compression
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub stored_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub mime_type: String,
}

/// Flat on-disk directory holding uploads and compression outputs.
/// The file names are the only state; there is no index.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// `<millis>-<8 hex>-<sanitized name>`; the random part keeps same-millisecond uploads apart
    pub fn unique_name(original_name: &str) -> String {
        let discriminator = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            &discriminator[..8],
            sanitize_filename(original_name)
        )
    }

    /// Stream an upload to a fresh, uniquely named file.
    /// A partially written file is removed if the stream fails.
    pub async fn persist<R>(
        &self,
        original_name: &str,
        mime_type: &str,
        mut reader: R,
    ) -> Result<UploadedFile, ProcessingError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let stored_name = Self::unique_name(original_name);
        let path = self.root.join(&stored_name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| ProcessingError::io(&path, e))?;

        let written = match tokio::io::copy(&mut reader, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                self.discard(&path).await;
                return Err(ProcessingError::io(&path, e));
            }
        };

        if let Err(e) = file.flush().await {
            drop(file);
            self.discard(&path).await;
            return Err(ProcessingError::io(&path, e));
        }

        tracing::info!(
            "Stored upload {} as {} ({} bytes)",
            original_name,
            stored_name,
            written
        );

        Ok(UploadedFile {
            original_name: original_name.to_string(),
            stored_name,
            path,
            size: written,
            mime_type: mime_type.to_string(),
        })
    }

    /// Best-effort removal used on error paths; a file that is already gone is not an error
    pub async fn discard(&self, path: &Path) {
        remove_if_exists(path).await;
    }
}

pub async fn file_size(path: &Path) -> Result<u64, ProcessingError> {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len())
        .map_err(|e| ProcessingError::io(path, e))
}

pub async fn remove_file(path: &Path) -> Result<(), ProcessingError> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|e| ProcessingError::io(path, e))
}

pub async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::error!("Failed to remove {}: {}", path.display(), e),
    }
}
