//! Runtime pieces shared by every handler:
//! - [`AppError`] / [`Error`]: status-carrying errors and the JSON error envelope
//! - [`CorsPolicy`] / [`cors_middleware`]: CORS negotiation for preflight and main requests
//! - [`decode_body`] / [`Validated`]: buffered, validated request bodies
//! - [`RequiredFields`]: per-type required-field descriptors
//! - [`write_res`] / [`write_err`]: typed and error responses
//! - [`new_ctx`] / [`path_id`]: request context helpers

mod body;
mod cors;
mod error;
mod request;
mod response;
mod status_map;
mod validate;

pub use body::{decode_binary_body, decode_body, BinaryCodec, Validated};
pub use cors::{apply_wildcard_cors, cors_middleware, CorsPolicy, CORS_MAX_AGE};
pub use error::{
    detail_of, status_of, wrap, AppError, BoxError, Error, ErrorBody, ErrorEnvelope,
    InvalidStatusCode, ResultExt, INTERNAL_ERROR_MESSAGE,
};
pub use request::{client_ip_header_names, new_ctx, path_id, RequestContext, CLIENT_IP_HEADERS};
pub use response::{write_binary_res, write_err, write_res};
pub use status_map::{error_class, ErrorClass};
pub use validate::{check_required, IsZero, MissingField, RequiredField, RequiredFields};
