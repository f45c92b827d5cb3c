use core::str::FromStr;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fiscalhub_core::{DomainError, TerminalId};
use fiscalhub_registry::User;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TerminalExistsRequest {
    pub cash_register_number: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct TerminalExistsResponse {
    pub id: TerminalId,
}

#[derive(Debug, Serialize)]
pub struct TerminalStatusResponse {
    pub is_active: bool,
}

/// `{"items": [...]}` wrapper used by every list endpoint.
pub fn items<T: Serialize>(items: Vec<T>) -> serde_json::Value {
    serde_json::json!({ "items": items })
}

/// Parse a path segment into a typed id, answering 400 on garbage.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|e: DomainError| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiscalhub_core::UserId;

    #[test]
    fn ids_parse_or_answer_bad_request() {
        assert_eq!(parse_id::<UserId>("12").unwrap(), UserId::new(12));
        assert_eq!(parse_id::<UserId>("abc").unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_id::<UserId>("-1").unwrap_err().status(), StatusCode::BAD_REQUEST);
    }
}
