#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use pdf_compress_backend::config::AppConfig;
use pdf_compress_backend::services::compression::CompressionService;
use pdf_compress_backend::services::compressor::{CompressorError, PdfCompressor};
use pdf_compress_backend::services::storage::UploadStore;
use pdf_compress_backend::{AppState, create_app};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

/// Writes an output whose size is derived from the input size
pub struct ResizingCompressor {
    pub resize: fn(u64) -> u64,
    pub calls: AtomicUsize,
}

impl ResizingCompressor {
    pub fn new(resize: fn(u64) -> u64) -> Self {
        Self {
            resize,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn halving() -> Self {
        Self::new(|len| len / 2)
    }

    pub fn doubling() -> Self {
        Self::new(|len| len * 2)
    }

    pub fn same_size() -> Self {
        Self::new(|len| len)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfCompressor for ResizingCompressor {
    async fn compress(&self, input: &Path, output: &Path) -> Result<(), CompressorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let len = tokio::fs::metadata(input).await?.len();
        let size = (self.resize)(len) as usize;
        tokio::fs::write(output, vec![b'c'; size]).await?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Leaves a partial output behind, then exits non-zero
pub struct FailingCompressor;

#[async_trait]
impl PdfCompressor for FailingCompressor {
    async fn compress(&self, _input: &Path, output: &Path) -> Result<(), CompressorError> {
        tokio::fs::write(output, b"%PDF-partial").await?;
        Err(CompressorError::NonZeroExit {
            code: Some(1),
            stderr: "Error: /undefined in --file--".to_string(),
        })
    }

    async fn health_check(&self) -> bool {
        false
    }
}

/// Writes a partial output and then never finishes
pub struct HangingCompressor;

#[async_trait]
impl PdfCompressor for HangingCompressor {
    async fn compress(&self, _input: &Path, output: &Path) -> Result<(), CompressorError> {
        // Written synchronously so the partial file exists before the first suspension point
        std::fs::write(output, b"%PDF-partial")?;
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

pub struct TestApp {
    pub router: Router,
    pub dir: TempDir,
    pub shutdown: CancellationToken,
}

impl TestApp {
    pub fn new(compressor: Arc<dyn PdfCompressor>) -> Self {
        Self::with_timeout(compressor, Duration::from_secs(10))
    }

    pub fn with_timeout(compressor: Arc<dyn PdfCompressor>, timeout: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            upload_dir: dir.path().to_path_buf(),
            max_file_size: 1024 * 1024,
            ..AppConfig::development()
        };
        let shutdown = CancellationToken::new();
        let state = AppState {
            store: Arc::new(UploadStore::new(dir.path())),
            compression: Arc::new(CompressionService::new(compressor, timeout)),
            config,
            shutdown: shutdown.clone(),
        };

        Self {
            router: create_app(state),
            dir,
            shutdown,
        }
    }

    pub fn files(&self) -> Vec<String> {
        list_files(self.dir.path())
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub async fn send(&self, body: Bytes) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header(
                        "Content-Type",
                        format!("multipart/form-data; boundary={}", BOUNDARY),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn upload_pdf(&self, filename: &str, content: &[u8]) -> (StatusCode, Value) {
        self.send(multipart_body(&[Part::file(
            "pdf",
            filename,
            "application/pdf",
            content,
        )]))
        .await
    }
}

pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn fake_pdf(len: usize) -> Vec<u8> {
    let mut data = b"%PDF-1.4\n".to_vec();
    data.resize(len.max(data.len()), b'x');
    data
}

pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            content_type: Some(content_type),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Bytes {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    Bytes::from(body)
}

/// Writes a half-size output, then makes the upload directory read-only so the loser cannot be deleted
#[cfg(unix)]
pub struct LockingCompressor;

#[cfg(unix)]
#[async_trait]
impl PdfCompressor for LockingCompressor {
    async fn compress(&self, input: &Path, output: &Path) -> Result<(), CompressorError> {
        let len = tokio::fs::metadata(input).await?.len();
        tokio::fs::write(output, vec![b'c'; (len / 2) as usize]).await?;
        if let Some(dir) = output.parent() {
            set_mode(dir, 0o555);
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(unix)]
pub fn set_mode(dir: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(mode)).unwrap();
}

/// Whether a read-only directory actually stops this user from deleting entries (false for root)
#[cfg(unix)]
pub fn read_only_dirs_enforced() -> bool {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("victim");
    std::fs::write(&file, b"x").unwrap();
    set_mode(dir.path(), 0o555);
    let enforced = std::fs::remove_file(&file).is_err();
    set_mode(dir.path(), 0o755);
    enforced
}
