use crate::AppState;
use crate::api::error::AppError;
use crate::services::compression::ProcessingError;
use crate::services::storage::{UploadStore, UploadedFile};
use crate::utils::validation::is_pdf_content_type;
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::MultipartError,
    },
    http::StatusCode,
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;

use super::types::*;

/// Multipart field carrying the document
pub const PDF_FIELD: &str = "pdf";

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = PdfUploadForm, description = "PDF upload", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "PDF compressed and the smaller file retained", body = UploadResponse),
        (status = 400, description = "No file uploaded or not a PDF", body = ErrorResponse),
        (status = 413, description = "Upload exceeds the size limit", body = ErrorResponse),
        (status = 500, description = "Compression or storage failed", body = ErrorResponse)
    ),
    tag = "upload"
)]
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = match receive_upload(&state.store, &mut multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            // Consume the remaining multipart stream to avoid a TCP reset on the client
            tracing::warn!("Upload rejected early: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            return Err(e);
        }
    };
    let upload = upload.ok_or(ProcessingError::MissingInput)?;

    // The workflow runs detached so a dropped request still kills the subprocess and cleans up
    let cancel = state.shutdown.child_token();
    let guard = cancel.clone().drop_guard();
    let compression = state.compression.clone();
    let task = tokio::spawn(async move { compression.process(Some(&upload), cancel).await });

    let result = task
        .await
        .map_err(|e| AppError::Internal(format!("Compression task failed: {}", e)))??;
    guard.disarm();

    Ok(Json(UploadResponse::from_result(&result, &state.config)))
}

/// Upload Receiver: persist the first `pdf` field, ignoring any other fields
async fn receive_upload(
    store: &UploadStore,
    multipart: &mut Multipart,
) -> Result<Option<UploadedFile>, AppError> {
    let mut upload: Option<UploadedFile> = None;

    let result = async {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some(PDF_FIELD) || upload.is_some() {
                continue;
            }

            let original_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);

            if !is_pdf_content_type(content_type.as_deref()) {
                return Err(AppError::from(ProcessingError::InvalidFileType(
                    content_type.unwrap_or_else(|| "none".to_string()),
                )));
            }

            let reader = StreamReader::new(field.map_err(std::io::Error::other));
            let stored = store
                .persist(&original_name, mime::APPLICATION_PDF.as_ref(), reader)
                .await
                .map_err(stream_error)?;
            upload = Some(stored);
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => Ok(upload),
        Err(e) => {
            if let Some(stored) = &upload {
                store.discard(&stored.path).await;
            }
            Err(e)
        }
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// A failed persist caused by the request body is the client's fault, not a storage failure
fn stream_error(e: ProcessingError) -> AppError {
    if let ProcessingError::IoFailure { source, .. } = &e {
        if let Some(inner) = source
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MultipartError>())
        {
            return if inner.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge(
                    "Request body exceeds the maximum allowed limit".to_string(),
                )
            } else {
                AppError::BadRequest(inner.body_text())
            };
        }
    }
    AppError::from(e)
}
