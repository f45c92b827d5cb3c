//! Export of arbitrary JSON objects as CSV or XLSX.

mod columns;
mod csv;
mod xlsx;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::instrument;

use fiscalhub_core::UserId;

use crate::store::{StoreError, UserStore};

pub use self::columns::header_label;
pub use self::csv::write_csv;
pub use self::xlsx::write_xlsx;

pub type ExportObject = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write csv: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("failed to flush csv: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write xlsx: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("no data to export")]
    Empty,

    #[error("export exceeds the sheet limits")]
    TooLarge,

    #[error("failed to resolve user logins: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    /// File name without extension; a timestamped default is used when blank.
    pub filename: Option<String>,
    pub format: ExportFormat,
    pub objects: Vec<ExportObject>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedExport {
    pub filename: String,
    pub format: ExportFormat,
    pub body: Vec<u8>,
}

/// Renders export requests, replacing `user_id` columns with the owner's login.
#[derive(Clone)]
pub struct Exporter {
    users: Arc<dyn UserStore>,
}

impl Exporter {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    #[instrument(skip(self, request), fields(objects = request.objects.len(), format = ?request.format), err)]
    pub async fn export(&self, request: ExportRequest, now: DateTime<Utc>) -> Result<RenderedExport, ExportError> {
        let format = request.format;
        let filename = export_filename(request.filename.as_deref(), format, now);

        let mut objects = request.objects;
        for object in &mut objects {
            self.resolve_user_login(object).await?;
        }

        let body = match format {
            ExportFormat::Csv => {
                let mut body = Vec::new();
                write_csv(&objects, &mut body)?;
                body
            }
            ExportFormat::Xlsx => write_xlsx(&objects)?,
        };

        tracing::info!(filename = %filename, bytes = body.len(), "export rendered");
        Ok(RenderedExport { filename, format, body })
    }

    /// Swap `user_id` for `user_login` when the id resolves; otherwise keep it.
    async fn resolve_user_login(&self, object: &mut ExportObject) -> Result<(), StoreError> {
        let Some(id) = object.get("user_id").and_then(user_id_of) else {
            return Ok(());
        };

        if let Some(user) = self.users.get_by_id(id).await? {
            object.remove("user_id");
            object.insert("user_login".to_string(), Value::String(user.username));
        }
        Ok(())
    }
}

fn user_id_of(value: &Value) -> Option<UserId> {
    match value {
        Value::Number(n) => n.as_i64().map(UserId::new),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// `<name>.<ext>`, defaulting to `export_<YYYY-MM-DD_HH-MM-SS>.<ext>`.
///
/// Characters that could break out of a `Content-Disposition` value or a path
/// are replaced with `_`.
pub fn export_filename(requested: Option<&str>, format: ExportFormat, now: DateTime<Utc>) -> String {
    let base = match requested.map(str::trim) {
        Some(name) if !name.is_empty() => name
            .chars()
            .map(|c| match c {
                '"' | '\\' | '/' | ';' | '\r' | '\n' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect(),
        _ => format!("export_{}", now.format("%Y-%m-%d_%H-%M-%S")),
    };
    format!("{base}.{}", format.extension())
}
