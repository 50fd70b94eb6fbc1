//! Request body decoding with required-field validation.

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::RequestExt;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

use super::error::{AppError, BoxError};
use super::validate::RequiredFields;

/// Payload types with their own binary wire format.
///
/// Use [`decode_binary_body`] and [`write_binary_res`](crate::write_binary_res)
/// for these; everything else goes through JSON.
pub trait BinaryCodec: Sized {
    /// Decode from the raw request body.
    ///
    /// # Errors
    ///
    /// Returns the codec's error if `bytes` is not a valid encoding.
    fn from_binary(bytes: &[u8]) -> Result<Self, BoxError>;

    /// Encode for a response body.
    ///
    /// # Errors
    ///
    /// Returns the codec's error if `self` can't be encoded.
    fn to_binary(&self) -> Result<Vec<u8>, BoxError>;
}

/// Read the whole body and put the bytes back so it can be read again.
///
/// The read is capped by the route's `DefaultBodyLimit` (2 MB when none is
/// configured); exceeding it is a `"read body: ..."` error.
async fn buffer_body(request: &mut Request) -> Result<Bytes, AppError> {
    let mut staged = Request::new(std::mem::take(request.body_mut()));
    *staged.extensions_mut() = request.extensions().clone();
    let body = staged.with_limited_body().into_body();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            tracing::debug!(error = %err, "reading request body failed");
            return Err(AppError::new_bad_request("read body", Some(&err)));
        }
    };

    *request.body_mut() = Body::from(bytes.clone());

    if bytes.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "missing body"));
    }
    Ok(bytes)
}

fn validate<T: RequiredFields>(value: T) -> Result<T, AppError> {
    match value.check_required() {
        Ok(()) => Ok(value),
        Err(missing) => {
            tracing::debug!(field = missing.name, "request body failed validation");
            Err(AppError::new(StatusCode::BAD_REQUEST, missing.to_string()))
        }
    }
}

/// Decode a JSON request body into `T` and check its required fields.
///
/// The body stays readable afterwards: the consumed bytes are put back into
/// `request`.
///
/// # Errors
///
/// Every failure is a `400` [`AppError`]:
/// - `"read body: <cause>"` if the body stream fails
/// - `"missing body"` if the body is empty
/// - `"decode: <cause>"` if the JSON doesn't match `T`
/// - `missing required field: "<name>"` if validation fails
pub async fn decode_body<T>(request: &mut Request) -> Result<T, AppError>
where
    T: DeserializeOwned + RequiredFields,
{
    let bytes = buffer_body(request).await?;
    let value = serde_json::from_slice(&bytes).map_err(|err| {
        tracing::debug!(error = %err, "decoding JSON request body failed");
        AppError::new_bad_request("decode", Some(&err))
    })?;
    validate(value)
}

/// Decode a request body with `T`'s [`BinaryCodec`] and check its required
/// fields.
///
/// # Errors
///
/// Same as [`decode_body`], with the codec's error as the decode cause.
pub async fn decode_binary_body<T>(request: &mut Request) -> Result<T, AppError>
where
    T: BinaryCodec + RequiredFields,
{
    let bytes = buffer_body(request).await?;
    let value = T::from_binary(&bytes).map_err(|err| {
        tracing::debug!(error = %err, "decoding binary request body failed");
        AppError::new_bad_request("decode", Some(&err))
    })?;
    validate(value)
}

/// Extractor running [`decode_body`] on the request.
///
/// Rejects with the `400` [`AppError`], rendered as the JSON error envelope.
///
/// ```
/// use axum::{routing::post, Json, Router};
/// use cloudfn::Validated;
///
/// async fn echo(Validated(body): Validated<serde_json::Value>) -> Json<serde_json::Value> {
///     Json(body)
/// }
///
/// let app: Router = Router::new().route("/", post(echo));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Validated<T>(pub T);

impl<T, S> FromRequest<S> for Validated<T>
where
    T: DeserializeOwned + RequiredFields + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(mut req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        decode_body(&mut req).await.map(Self)
    }
}
