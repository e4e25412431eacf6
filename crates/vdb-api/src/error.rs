//! Maps the core's [`vdb_common::Error`] onto HTTP status codes (§6.1, §7).
//!
//! Grounded on the teacher's `lumadb-compat::CompatError` (one error type
//! crossing the service/HTTP boundary) combined with `actix_web`'s
//! `ResponseError` trait, which the teacher's own REST layer (`rest/mod.rs`)
//! approximates by hand-matching on error variants per handler. We collapse
//! that per-handler matching into one `ResponseError` impl instead.

use actix_web::{HttpResponse, ResponseError};
use vdb_common::error::Error;

#[derive(Debug)]
pub struct ApiError(pub Error);

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Error::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.0.to_string(),
        }))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
