use std::path::Path;

const FALLBACK_NAME: &str = "upload.pdf";

/// Sanitize a client-supplied filename so it is safe to use as a single path component
pub fn sanitize_filename(filename: &str) -> String {
    // Normalise Windows separators first so `Path` strips every directory component
    let unified = filename.replace('\\', "/");
    let name = Path::new(&unified)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {}", filename);
    }

    // We allow most Unicode characters but block path separators and reserved characters
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == '/'
                || c == '\\'
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    let sanitized = sanitized.trim().trim_start_matches('.').to_string();
    if sanitized.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized
    }
}

/// Whether a multipart content type denotes a PDF (parameters such as charset are ignored)
pub fn is_pdf_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .is_some_and(|m| {
            m.essence_str()
                .eq_ignore_ascii_case(mime::APPLICATION_PDF.essence_str())
        })
}
