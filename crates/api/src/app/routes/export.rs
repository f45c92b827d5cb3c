use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;

use fiscalhub_infra::ExportRequest;

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn export_objects(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ExportRequest>,
) -> axum::response::Response {
    let export = match services.exporter.export(body, Utc::now()).await {
        Ok(export) => export,
        Err(e) => return errors::export_error_to_response(e),
    };

    let disposition = content_disposition(&export.filename);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(export.format.content_type())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response()
}

/// `attachment` disposition with an ASCII fallback name plus the exact name
/// as an RFC 5987 `filename*` parameter.
fn content_disposition(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();

    let mut encoded = String::with_capacity(filename.len() * 3);
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    HeaderValue::from_str(&format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
