use std::env;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Runtime configuration for the upload and compression service
#[derive(Debug, Clone, Validate)]
pub struct AppConfig {
    /// Flat directory holding uploads and compression outputs (default: "uploads")
    pub upload_dir: PathBuf,

    /// URL prefix the upload directory is served under (default: "/uploads")
    #[validate(length(min = 2, message = "Public prefix must name a path segment"))]
    pub public_prefix: String,

    /// Address the HTTP server binds to (default: "0.0.0.0")
    pub bind_address: String,

    /// Port for the HTTP server (default: 5000)
    #[validate(range(min = 1, message = "Port must be non-zero"))]
    pub port: u16,

    /// Allowed CORS origins (comma separated)
    pub allowed_origins: Vec<String>,

    /// Maximum upload size in bytes (default: 100 MB)
    #[validate(range(min = 1, message = "Max file size must be positive"))]
    pub max_file_size: usize,

    /// Compressor backend: "ghostscript" or "passthrough" (default: "ghostscript")
    pub compressor_type: String,

    /// Ghostscript executable (default: "gs")
    #[validate(length(min = 1, message = "Ghostscript binary cannot be empty"))]
    pub ghostscript_bin: String,

    /// Upper bound for a single compressor run in seconds (default: 120)
    #[validate(range(min = 1, message = "Compression timeout must be at least one second"))]
    pub compression_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            public_prefix: "/uploads".to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            max_file_size: 100 * 1024 * 1024, // 100 MB
            compressor_type: "ghostscript".to_string(),
            ghostscript_bin: "gs".to_string(),
            compression_timeout_secs: 120,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            public_prefix: env::var("PUBLIC_PREFIX")
                .map(|v| normalize_prefix(&v))
                .unwrap_or(default.public_prefix),

            bind_address: env::var("BIND_ADDRESS").unwrap_or(default.bind_address),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_origins),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            compressor_type: env::var("COMPRESSOR_TYPE").unwrap_or(default.compressor_type),

            ghostscript_bin: env::var("GHOSTSCRIPT_BIN").unwrap_or(default.ghostscript_bin),

            compression_timeout_secs: env::var("COMPRESSION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.compression_timeout_secs),
        }
    }

    /// Create config for development (no Ghostscript required, short timeout)
    pub fn development() -> Self {
        Self {
            compressor_type: "passthrough".to_string(),
            compression_timeout_secs: 30,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
            ..Self::default()
        }
    }

    pub fn compression_timeout(&self) -> Duration {
        Duration::from_secs(self.compression_timeout_secs)
    }

    /// Relative path clients use to fetch a stored file, e.g. "uploads/compressed-1-a.pdf"
    pub fn public_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix.trim_matches('/'), file_name)
    }
}

fn normalize_prefix(raw: &str) -> String {
    format!("/{}", raw.trim().trim_matches('/'))
}
