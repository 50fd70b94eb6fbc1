//! HTTP-aware errors: [`AppError`] carries a status code, [`Error`] is what
//! handlers return to the response boundary.

use std::fmt;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use super::status_map::checked_status;

/// Boxed error used for arbitrary underlying causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Message sent to clients for errors that carry no HTTP status.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// An error with an HTTP status, a client-facing message, and optional
/// server-only detail.
///
/// Only [`message`](Self::message) ever reaches the client, wrapped in the
/// JSON envelope:
///
/// ```json
/// { "error": { "message": "..." } }
/// ```
///
/// [`detail`](Self::detail) is for server-side logs.
///
/// # Examples
///
/// ```
/// use axum::http::StatusCode;
/// use cloudfn::AppError;
///
/// let err = AppError::new(StatusCode::CONFLICT, "already exists")
///     .with_detail("campaign 42 owned by tenant 7");
/// assert_eq!(err.status(), StatusCode::CONFLICT);
/// assert_eq!(err.to_json(), r#"{"error":{"message":"already exists"}}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

/// Returned by [`AppError::try_from_u16`] for codes outside `100..=599`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid HTTP status code {0}; expected 100..=599")]
pub struct InvalidStatusCode(pub u16);

impl AppError {
    /// Create an error with the given status and message.
    ///
    /// Statuses above 599 are not valid for an error response and are
    /// replaced with `500 Internal Server Error`.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: checked_status(status),
            message: message.into(),
            detail: None,
        }
    }

    /// Create an error with server-only diagnostic detail attached.
    #[must_use]
    pub fn new_with_detail(
        status: StatusCode,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(status, message).with_detail(detail)
    }

    /// Create an error from a raw status code.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidStatusCode`] unless `code` is in `100..=599`.
    pub fn try_from_u16(code: u16, message: impl Into<String>) -> Result<Self, InvalidStatusCode> {
        if !(100..=599).contains(&code) {
            return Err(InvalidStatusCode(code));
        }
        let status = StatusCode::from_u16(code).map_err(|_| InvalidStatusCode(code))?;
        Ok(Self::new(status, message))
    }

    /// `400 Bad Request`, with `cause` appended as `"<message>: <cause>"`.
    ///
    /// ```
    /// use cloudfn::AppError;
    ///
    /// let err = AppError::new_bad_request("decode", Some(&"expected `}`"));
    /// assert_eq!(err.message(), "decode: expected `}`");
    /// ```
    #[must_use]
    pub fn new_bad_request(message: impl Into<String>, cause: Option<&dyn fmt::Display>) -> Self {
        Self::with_cause(StatusCode::BAD_REQUEST, message.into(), cause)
    }

    /// `404 Not Found`, with `cause` appended as `"<message>: <cause>"`.
    #[must_use]
    pub fn new_not_found(message: impl Into<String>, cause: Option<&dyn fmt::Display>) -> Self {
        Self::with_cause(StatusCode::NOT_FOUND, message.into(), cause)
    }

    fn with_cause(status: StatusCode, message: String, cause: Option<&dyn fmt::Display>) -> Self {
        match cause {
            Some(cause) => Self::new(status, format!("{message}: {cause}")),
            None => Self::new(status, message),
        }
    }

    /// `405 method not allowed`.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }

    /// `404 not found`.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not found")
    }

    /// `401 unauthorized`.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    /// `503 service unavailable`.
    #[must_use]
    pub fn service_unavailable() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "service unavailable")
    }

    /// `400 bad request`.
    #[must_use]
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad request")
    }

    /// Attach server-only detail, replacing any previous detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// HTTP status of the response this error produces.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Server-only diagnostic detail, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Prefix the message with `context`, keeping status and detail.
    #[must_use]
    pub fn wrap(self, context: impl fmt::Display) -> Self {
        Self {
            message: format!("{context}: {}", self.message),
            ..self
        }
    }

    /// Render the JSON error envelope.
    ///
    /// Never fails: if serialization goes wrong the bare message is returned.
    #[must_use]
    pub fn to_json(&self) -> String {
        envelope_json(&self.message)
    }
}

/// Wire shape of every error body: `{"error": {"message": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The wrapped error object.
    pub error: ErrorBody,
}

/// Inner object of an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable, client-safe message.
    pub message: String,
}

#[derive(Serialize)]
struct BorrowedEnvelope<'a> {
    error: BorrowedBody<'a>,
}

#[derive(Serialize)]
struct BorrowedBody<'a> {
    message: &'a str,
}

fn envelope_json(message: &str) -> String {
    let envelope = BorrowedEnvelope {
        error: BorrowedBody { message },
    };
    serde_json::to_string(&envelope).unwrap_or_else(|_| message.to_owned())
}

/// Error returned by handlers and consumed by the response writers.
///
/// [`Error::App`] keeps its status through any number of [`wrap`](Error::wrap)
/// calls. Everything else is [`Error::Internal`], answered with `500` and a
/// generic message; its text only goes to server logs.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An error with a known HTTP status.
    #[error(transparent)]
    App(#[from] AppError),

    /// An unexpected failure.
    #[error("{message}")]
    Internal {
        /// Full error text, including any wrapped context.
        message: String,
        /// Underlying cause, if one was captured.
        #[source]
        source: Option<BoxError>,
    },
}

impl Error {
    /// Build an internal error from any error value.
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Build an internal error from plain text.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Prefix the error text with `context` as `"<context>: <inner>"`.
    ///
    /// An [`Error::App`] stays an `App` error with the same status.
    ///
    /// ```
    /// use axum::http::StatusCode;
    /// use cloudfn::{AppError, Error};
    ///
    /// let err = Error::from(AppError::not_found()).wrap("load campaign");
    /// assert_eq!(err.status(), StatusCode::NOT_FOUND);
    /// assert_eq!(err.to_string(), "load campaign: not found");
    /// ```
    #[must_use]
    pub fn wrap(self, context: impl fmt::Display) -> Self {
        match self {
            Self::App(err) => Self::App(err.wrap(context)),
            Self::Internal { message, source } => Self::Internal {
                message: format!("{context}: {message}"),
                source,
            },
        }
    }

    /// HTTP status for this error; `500` unless it is an [`Error::App`].
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::App(err) => err.status(),
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Server-only detail of an [`Error::App`].
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::App(err) => err.detail(),
            Self::Internal { .. } => None,
        }
    }

    /// The message a client is allowed to see.
    #[must_use]
    pub fn client_message(&self) -> &str {
        match self {
            Self::App(err) => err.message(),
            Self::Internal { .. } => INTERNAL_ERROR_MESSAGE,
        }
    }

    /// Render the JSON error envelope with [`client_message`](Self::client_message).
    #[must_use]
    pub fn to_json(&self) -> String {
        envelope_json(self.client_message())
    }
}

/// Wrap `err` with `context`, preserving the HTTP status of app errors.
///
/// Foreign errors (I/O, decoding, driver errors) go through
/// [`Error::internal`] first, which makes them `500`s:
///
/// ```
/// use axum::http::StatusCode;
/// use cloudfn::{status_of, wrap, Error};
///
/// let io = std::io::Error::other("disk full");
/// let err = wrap("save campaign", Error::internal(io));
/// assert_eq!(status_of(&err), StatusCode::INTERNAL_SERVER_ERROR);
/// assert_eq!(err.to_string(), "save campaign: disk full");
/// ```
pub fn wrap(context: impl fmt::Display, err: impl Into<Error>) -> Error {
    err.into().wrap(context)
}

/// HTTP status of `err`; `500` for anything that is not an [`AppError`].
#[must_use]
pub const fn status_of(err: &Error) -> StatusCode {
    err.status()
}

/// Server-only detail of `err`, for logging.
#[must_use]
pub fn detail_of(err: &Error) -> Option<&str> {
    err.detail()
}

/// Add context to the error side of a `Result`.
///
/// Works for any error convertible into [`Error`]. For a foreign error, map
/// it with [`Error::internal`] first:
/// `res.map_err(Error::internal).wrap_err("load")`.
///
/// ```
/// use cloudfn::{AppError, ResultExt};
///
/// fn find() -> Result<u32, AppError> {
///     Err(AppError::not_found())
/// }
///
/// let err = find().wrap_err("lookup").unwrap_err();
/// assert_eq!(err.to_string(), "lookup: not found");
/// ```
pub trait ResultExt<T> {
    /// Convert the error into [`Error`] and prefix it with `context`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error if `self` is `Err`.
    fn wrap_err<C: fmt::Display>(self, context: C) -> Result<T, Error>;
}

impl<T, E: Into<Error>> ResultExt<T> for Result<T, E> {
    fn wrap_err<C: fmt::Display>(self, context: C) -> Result<T, Error> {
        self.map_err(|err| err.into().wrap(context))
    }
}
