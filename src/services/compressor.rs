use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Why a compressor run did not produce a usable output file
#[derive(Error, Debug)]
pub enum CompressorError {
    #[error("Failed to spawn compressor: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Compressor exited with status {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("Compressor timed out after {0:?}")]
    Timeout(Duration),

    #[error("Compressor run was cancelled")]
    Cancelled,
}

/// Trait for external PDF compressor implementations
///
/// `compress` reads `input` and writes the rewritten document to `output`.
/// Implementations must stop their work when the returned future is dropped.
#[async_trait::async_trait]
pub trait PdfCompressor: Send + Sync {
    async fn compress(&self, input: &Path, output: &Path) -> Result<(), CompressorError>;

    /// Check if the underlying tool is installed and runnable
    async fn health_check(&self) -> bool;
}

/// Ghostscript `pdfwrite` rewriter at "screen" quality
pub struct GhostscriptCompressor {
    program: String,
}

impl GhostscriptCompressor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Fixed argument vector. Paths are separate argv entries, so no shell quoting is involved.
    pub fn args(input: &Path, output: &Path) -> Vec<OsString> {
        let mut out_arg = OsString::from("-sOutputFile=");
        out_arg.push(output.as_os_str());

        vec![
            "-sDEVICE=pdfwrite".into(),
            "-dCompatibilityLevel=1.4".into(),
            "-dPDFSETTINGS=/screen".into(),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            "-dBATCH".into(),
            out_arg,
            input.as_os_str().to_os_string(),
        ]
    }
}

#[async_trait::async_trait]
impl PdfCompressor for GhostscriptCompressor {
    async fn compress(&self, input: &Path, output: &Path) -> Result<(), CompressorError> {
        tracing::debug!(
            "Running {} on {} -> {}",
            self.program,
            input.display(),
            output.display()
        );

        // kill_on_drop ties the child's lifetime to this future, which is how timeouts reach it
        let child = Command::new(&self.program)
            .args(Self::args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let result = child.wait_with_output().await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            tracing::error!("Error compressing PDF: {}", stderr);
            return Err(CompressorError::NonZeroExit {
                code: result.status.code(),
                stderr,
            });
        }

        Ok(())
    }

    async fn health_check(&self) -> bool {
        match Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                tracing::debug!(
                    "Ghostscript version: {}",
                    String::from_utf8_lossy(&output.stdout).trim()
                );
                true
            }
            _ => false,
        }
    }
}

/// Copies the input unchanged, for development machines without Ghostscript
pub struct PassthroughCompressor;

#[async_trait::async_trait]
impl PdfCompressor for PassthroughCompressor {
    async fn compress(&self, input: &Path, output: &Path) -> Result<(), CompressorError> {
        tracing::warn!("PassthroughCompressor: Skipping compression (development mode)");
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Factory function to create the compressor named in config
pub fn create_compressor(compressor_type: &str, ghostscript_bin: &str) -> Box<dyn PdfCompressor> {
    match compressor_type.to_lowercase().as_str() {
        "ghostscript" | "gs" => Box::new(GhostscriptCompressor::new(ghostscript_bin)),
        "passthrough" | "noop" | "none" => Box::new(PassthroughCompressor),
        _ => {
            tracing::warn!(
                "Unknown compressor type '{}', using Ghostscript",
                compressor_type
            );
            Box::new(GhostscriptCompressor::new(ghostscript_bin))
        }
    }
}
