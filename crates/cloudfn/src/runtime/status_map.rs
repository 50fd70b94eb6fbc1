//! HTTP status classification for error responses.

use axum::http::StatusCode;

/// Which side of the exchange an error status blames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// `4xx`: malformed or missing input.
    Client,
    /// `5xx`: serialization failures and unexpected internal errors.
    Server,
}

/// Classify an error status.
///
/// Returns `None` for statuses that are not errors (`1xx`-`3xx`).
///
/// # Examples
///
/// ```
/// use axum::http::StatusCode;
/// use cloudfn::{error_class, ErrorClass};
///
/// assert_eq!(error_class(StatusCode::NOT_FOUND), Some(ErrorClass::Client));
/// assert_eq!(error_class(StatusCode::BAD_GATEWAY), Some(ErrorClass::Server));
/// assert_eq!(error_class(StatusCode::OK), None);
/// ```
#[must_use]
pub fn error_class(status: StatusCode) -> Option<ErrorClass> {
    if status.is_client_error() {
        Some(ErrorClass::Client)
    } else if status.is_server_error() {
        Some(ErrorClass::Server)
    } else {
        None
    }
}

/// Clamp a status into the `100..=599` range usable for error responses.
pub(crate) fn checked_status(status: StatusCode) -> StatusCode {
    if status.as_u16() <= 599 {
        status
    } else {
        tracing::warn!(
            status = status.as_u16(),
            "status code out of range; answering 500 instead"
        );
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
