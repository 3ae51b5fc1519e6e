use crate::config::AppConfig;
use crate::services::compressor::PdfCompressor;
use std::sync::Arc;
use tracing::info;

pub async fn setup_compressor(config: &AppConfig) -> Arc<dyn PdfCompressor> {
    let compressor = crate::services::compressor::create_compressor(
        &config.compressor_type,
        &config.ghostscript_bin,
    );

    if compressor.health_check().await {
        info!("🗜️  PDF compressor '{}' is available", config.compressor_type);
    } else {
        tracing::warn!(
            "⚠️  PDF compressor '{}' ({}) is not runnable! Uploads will fail until it is installed.",
            config.compressor_type,
            config.ghostscript_bin
        );
    }

    compressor.into()
}
