use crate::config::AppConfig;
use crate::services::storage::UploadStore;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &AppConfig) -> anyhow::Result<Arc<UploadStore>> {
    let store = UploadStore::new(&config.upload_dir);

    if tokio::fs::try_exists(store.root()).await.unwrap_or(false) {
        info!("✅ Upload directory '{}' is ready", store.root().display());
    } else {
        info!(
            "📁 Upload directory '{}' not found, creating...",
            store.root().display()
        );
        store.ensure_dir().await.map_err(|e| {
            anyhow::anyhow!(
                "Failed to create upload directory '{}': {}",
                store.root().display(),
                e
            )
        })?;
    }

    Ok(Arc::new(store))
}
