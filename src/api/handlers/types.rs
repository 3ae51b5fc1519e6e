use crate::config::AppConfig;
use crate::services::compression::{CompressionResult, Outcome, format_kib};
use serde::Serialize;
use utoipa::ToSchema;

pub const SUCCESS_MESSAGE: &str = "File uploaded and processed successfully";

/// Multipart body accepted by `POST /upload`
#[derive(ToSchema)]
pub struct PdfUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub pdf: Vec<u8>,
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    #[schema(example = "512.00 KB")]
    pub original_size: String,
    #[schema(example = "128.25 KB")]
    pub compressed_size: String,
    #[schema(example = "128.25 KB")]
    pub final_size: String,
    pub pdf_name: String,
    #[schema(example = "uploads/compressed-1700000000000-ab12cd34-report.pdf")]
    pub final_path: String,
    #[schema(value_type = String, example = "kept-compressed")]
    pub outcome: Outcome,
}

impl UploadResponse {
    pub fn from_result(result: &CompressionResult, config: &AppConfig) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            original_size: format_kib(result.original_size),
            compressed_size: format_kib(result.compressed_size),
            final_size: format_kib(result.final_size),
            pdf_name: result.final_file_name.clone(),
            final_path: config.public_path(&result.final_file_name),
            outcome: result.outcome,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_response_uses_camel_case_fields() {
        let result = CompressionResult {
            original_size: 2048,
            compressed_size: 1024,
            final_size: 1024,
            final_file_name: "compressed-1-ab-doc.pdf".to_string(),
            final_path: PathBuf::from("uploads/compressed-1-ab-doc.pdf"),
            outcome: Outcome::KeptCompressed,
        };
        let response = UploadResponse::from_result(&result, &AppConfig::default());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["message"], SUCCESS_MESSAGE);
        assert_eq!(json["originalSize"], "2.00 KB");
        assert_eq!(json["compressedSize"], "1.00 KB");
        assert_eq!(json["finalSize"], "1.00 KB");
        assert_eq!(json["pdfName"], "compressed-1-ab-doc.pdf");
        assert_eq!(json["finalPath"], "uploads/compressed-1-ab-doc.pdf");
        assert_eq!(json["outcome"], "kept-compressed");
    }
}
