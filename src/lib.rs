pub mod api;
pub mod config;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::compression::CompressionService;
use crate::services::storage::UploadStore;
use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_pdf,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::types::PdfUploadForm,
            api::handlers::types::UploadResponse,
            api::handlers::types::ErrorResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "upload", description = "PDF upload and compression"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UploadStore>,
    pub compression: Arc<CompressionService>,
    pub config: AppConfig,
    /// Parent of every per-request cancellation token; cancelled on shutdown
    pub shutdown: CancellationToken,
}

pub fn create_app(state: AppState) -> Router {
    let static_files = ServeDir::new(state.store.root());

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/upload",
            post(api::handlers::upload::upload_pdf).layer(axum::extract::DefaultBodyLimit::max(
                state.config.max_file_size,
            )),
        )
        .nest_service(&state.config.public_prefix, static_files)
        .layer(cors_layer(&state.config.allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
}
