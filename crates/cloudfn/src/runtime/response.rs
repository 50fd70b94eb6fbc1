//! Response writers: typed results and JSON error envelopes.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::body::BinaryCodec;
use super::error::{AppError, Error};
use super::status_map::{error_class, ErrorClass};

const APPLICATION_JSON: &str = "application/json";
const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

fn with_body(status: StatusCode, content_type: &'static str, mut body: Vec<u8>) -> Response {
    body.push(b'\n');
    (
        status,
        [(CONTENT_TYPE, HeaderValue::from_static(content_type))],
        body,
    )
        .into_response()
}

/// Write an error as the JSON envelope with its HTTP status.
///
/// The status comes from [`Error::status`]: `500` unless the error is an
/// [`AppError`]. The client only ever sees [`Error::client_message`]; the
/// full error text and its detail are logged here instead.
///
/// ```
/// use axum::http::StatusCode;
/// use cloudfn::{write_err, AppError};
///
/// let response = write_err(AppError::not_found().into());
/// assert_eq!(response.status(), StatusCode::NOT_FOUND);
/// ```
pub fn write_err(err: Error) -> Response {
    let status = err.status();
    let detail = err.detail().unwrap_or_default();

    match error_class(status) {
        Some(ErrorClass::Client) => {
            tracing::debug!(status = status.as_u16(), detail, error = %err, "request rejected");
        }
        Some(ErrorClass::Server) | None => {
            tracing::error!(
                status = status.as_u16(),
                detail,
                error = &err as &(dyn std::error::Error + 'static),
                "request failed"
            );
        }
    }

    with_body(status, APPLICATION_JSON, err.to_json().into_bytes())
}

/// Write `result` as JSON with `200 OK`, or its error via [`write_err`].
///
/// A value that fails to serialize becomes a `500`.
///
/// ```
/// use axum::http::StatusCode;
/// use cloudfn::write_res;
///
/// let response = write_res(Ok(serde_json::json!({"id": 7})));
/// assert_eq!(response.status(), StatusCode::OK);
/// ```
pub fn write_res<T: Serialize>(result: Result<T, Error>) -> Response {
    let value = match result {
        Ok(value) => value,
        Err(err) => return write_err(err),
    };
    match serde_json::to_vec(&value) {
        Ok(bytes) => with_body(StatusCode::OK, APPLICATION_JSON, bytes),
        Err(err) => write_err(Error::internal(err).wrap("encode response")),
    }
}

/// Write `result` with its [`BinaryCodec`] encoding and `200 OK`, or its
/// error via [`write_err`].
pub fn write_binary_res<T: BinaryCodec>(result: Result<T, Error>) -> Response {
    let value = match result {
        Ok(value) => value,
        Err(err) => return write_err(err),
    };
    match value.to_binary() {
        Ok(bytes) => with_body(StatusCode::OK, APPLICATION_OCTET_STREAM, bytes),
        Err(source) => write_err(Error::Internal {
            message: format!("encode response: {source}"),
            source: Some(source),
        }),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        write_err(self)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        write_err(Error::App(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::{BoxError, ErrorEnvelope, INTERNAL_ERROR_MESSAGE};
    use http_body_util::BodyExt;

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response.headers()[CONTENT_TYPE].to_str().unwrap()
    }

    #[tokio::test]
    async fn app_error_response() {
        let response = write_err(AppError::new(StatusCode::CONFLICT, "taken").into());
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(content_type(&response), "application/json");
        assert_eq!(
            body_text(response).await,
            "{\"error\":{\"message\":\"taken\"}}\n"
        );
    }

    #[tokio::test]
    async fn internal_error_is_generic_500() {
        let response = write_err(Error::msg("db password rejected"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = body_text(response).await;
        assert!(!text.contains("password"), "{text}");
        let envelope: ErrorEnvelope = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(envelope.error.message, INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn detail_is_not_sent() {
        let err = AppError::bad_request().with_detail("secret detail");
        let text = body_text(err.into_response()).await;
        assert!(!text.contains("secret"), "{text}");
    }

    #[tokio::test]
    async fn wrapped_error_keeps_status() {
        let err = crate::wrap("handler", AppError::not_found());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_text(response).await,
            "{\"error\":{\"message\":\"handler: not found\"}}\n"
        );
    }

    #[tokio::test]
    async fn write_res_success() {
        let response = write_res(Ok(serde_json::json!({"id": 7})));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "application/json");
        assert_eq!(body_text(response).await, "{\"id\":7}\n");
    }

    #[tokio::test]
    async fn write_res_error() {
        let response = write_res::<()>(Err(AppError::unauthorized().into()));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("nope"))
        }
    }

    #[tokio::test]
    async fn serialization_failure_is_500() {
        let response = write_res(Ok(Unserializable));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = body_text(response).await;
        assert!(text.contains(INTERNAL_ERROR_MESSAGE), "{text}");
    }

    struct Blob(Vec<u8>);

    impl BinaryCodec for Blob {
        fn from_binary(bytes: &[u8]) -> Result<Self, BoxError> {
            Ok(Self(bytes.to_vec()))
        }

        fn to_binary(&self) -> Result<Vec<u8>, BoxError> {
            if self.0.is_empty() {
                return Err("empty blob".into());
            }
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn write_binary_success() {
        let response = write_binary_res(Ok(Blob(b"abc".to_vec())));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "application/octet-stream");
        assert_eq!(body_text(response).await, "abc\n");
    }

    #[tokio::test]
    async fn write_binary_encode_failure() {
        let response = write_binary_res(Ok(Blob(Vec::new())));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
