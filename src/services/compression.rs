use crate::services::compressor::{CompressorError, PdfCompressor};
use crate::services::storage::{UploadedFile, file_size, remove_file, remove_if_exists};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub const COMPRESSED_PREFIX: &str = "compressed-";

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("No file uploaded")]
    MissingInput,

    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("Compression failed: {0}")]
    CompressionFailed(#[from] CompressorError),

    #[error("I/O failure on {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessingError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::IoFailure {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Which candidate survived the size comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    KeptOriginal,
    KeptCompressed,
}

impl Outcome {
    /// The compressed file only wins when it is strictly smaller.
    /// An equal-size result is discarded along with larger ones.
    pub fn decide(original_size: u64, compressed_size: u64) -> Self {
        if compressed_size >= original_size {
            Outcome::KeptOriginal
        } else {
            Outcome::KeptCompressed
        }
    }
}

/// One compressor invocation for one upload
#[derive(Debug, Clone)]
pub struct CompressionAttempt {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl CompressionAttempt {
    pub fn for_input(input_path: &Path) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            output_path: compressed_path_for(input_path),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub original_size: u64,
    pub compressed_size: u64,
    pub final_size: u64,
    pub final_file_name: String,
    pub final_path: PathBuf,
    pub outcome: Outcome,
}

/// Same directory as the input, file name prefixed with `compressed-`
pub fn compressed_path_for(input_path: &Path) -> PathBuf {
    let name = input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input_path.with_file_name(format!("{}{}", COMPRESSED_PREFIX, name))
}

/// Bytes as kibibytes with two decimals, e.g. "12.50 KB".
/// Exact ties round up, in integer hundredths to avoid float ties rounding to even.
pub fn format_kib(bytes: u64) -> String {
    let hundredths = (bytes as u128 * 100 + 512) / 1024;
    format!("{}.{:02} KB", hundredths / 100, hundredths % 100)
}

/// Runs the compress, compare and retain workflow for a stored upload
pub struct CompressionService {
    compressor: Arc<dyn PdfCompressor>,
    timeout: Duration,
}

impl CompressionService {
    pub fn new(compressor: Arc<dyn PdfCompressor>, timeout: Duration) -> Self {
        Self {
            compressor,
            timeout,
        }
    }

    pub fn compressor(&self) -> &Arc<dyn PdfCompressor> {
        &self.compressor
    }

    pub async fn process(
        &self,
        upload: Option<&UploadedFile>,
        cancel: CancellationToken,
    ) -> Result<CompressionResult, ProcessingError> {
        let upload = upload.ok_or(ProcessingError::MissingInput)?;
        let attempt = CompressionAttempt::for_input(&upload.path);

        tracing::info!(
            "Compressing {} -> {}",
            attempt.input_path.display(),
            attempt.output_path.display()
        );

        if let Err(e) = self.run_compressor(&attempt, &cancel).await {
            // Whatever the tool left behind is not a valid result
            remove_if_exists(&attempt.output_path).await;
            tracing::error!(
                "Compression of {} failed: {}",
                attempt.input_path.display(),
                e
            );
            return Err(e.into());
        }

        match self.resolve(&attempt).await {
            Ok(result) => {
                tracing::info!(
                    "Resolved {}: {:?} (original {}, compressed {})",
                    upload.stored_name,
                    result.outcome,
                    format_kib(result.original_size),
                    format_kib(result.compressed_size)
                );
                Ok(result)
            }
            Err(e) => {
                // Roll back to the original: it is only deleted after the compressed size is known
                tracing::error!(
                    "Post-compression step failed for {}: {}",
                    upload.stored_name,
                    e
                );
                remove_if_exists(&attempt.output_path).await;
                Err(e)
            }
        }
    }

    async fn run_compressor(
        &self,
        attempt: &CompressionAttempt,
        cancel: &CancellationToken,
    ) -> Result<(), CompressorError> {
        // Dropping the losing branch drops the compressor future, which kills the subprocess
        tokio::select! {
            res = tokio::time::timeout(
                self.timeout,
                self.compressor.compress(&attempt.input_path, &attempt.output_path),
            ) => match res {
                Ok(inner) => inner,
                Err(_) => Err(CompressorError::Timeout(self.timeout)),
            },
            _ = cancel.cancelled() => Err(CompressorError::Cancelled),
        }
    }

    async fn resolve(
        &self,
        attempt: &CompressionAttempt,
    ) -> Result<CompressionResult, ProcessingError> {
        let original_size = file_size(&attempt.input_path).await?;
        let compressed_size = file_size(&attempt.output_path).await?;

        let outcome = Outcome::decide(original_size, compressed_size);
        let (final_path, final_size, loser) = match outcome {
            Outcome::KeptOriginal => (&attempt.input_path, original_size, &attempt.output_path),
            Outcome::KeptCompressed => {
                (&attempt.output_path, compressed_size, &attempt.input_path)
            }
        };

        remove_file(loser).await?;

        let final_file_name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(CompressionResult {
            original_size,
            compressed_size,
            final_size,
            final_file_name,
            final_path: final_path.clone(),
            outcome,
        })
    }
}
