//! Boilerplate for HTTP handlers deployed as standalone cloud function
//! endpoints, built on [Axum](https://docs.rs/axum).
//!
//! # Types
//!
//! - [`AppError`]: An error with an HTTP status, client message, and server-only detail
//! - [`Error`]: Either an [`AppError`] or an internal failure answered with `500`
//! - [`CorsPolicy`]: Allowed-origin negotiation with a shared origin cache
//! - [`RequiredFields`]: Declares which payload fields must be populated
//! - [`Validated`]: Extractor decoding and validating a JSON body
//! - [`RequestContext`]: Method, path, origin, and client IP of a request
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use axum::response::Response;
//! use axum::{middleware, routing::post, Router};
//! use cloudfn::{
//!     cors_middleware, write_res, AppError, CorsPolicy, Error, IsZero, RequiredField,
//!     RequiredFields, Validated,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct CreateCampaignReq {
//!     name: String,
//! }
//!
//! impl RequiredFields for CreateCampaignReq {
//!     fn required_fields() -> Vec<RequiredField<Self>> {
//!         vec![RequiredField::new("name", |r: &Self| r.name.is_zero())]
//!     }
//! }
//!
//! #[derive(Serialize)]
//! struct Campaign {
//!     id: u64,
//!     name: String,
//! }
//!
//! async fn create(Validated(req): Validated<CreateCampaignReq>) -> Response {
//!     write_res(store(req))
//! }
//!
//! fn store(req: CreateCampaignReq) -> Result<Campaign, Error> {
//!     if req.name == "taken" {
//!         return Err(AppError::bad_request().into());
//!     }
//!     Ok(Campaign { id: 1, name: req.name })
//! }
//!
//! let policy = Arc::new(CorsPolicy::new(["https://app.example.com"]).unwrap());
//! let app: Router = Router::new()
//!     .route("/", post(create))
//!     .layer(middleware::from_fn_with_state(policy, cors_middleware));
//! ```
//!
//! With the default `derive` feature, `#[derive(RequiredFields)]` generates the
//! descriptor list from `#[cloudfn(required)]` field markers.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod runtime;

pub use config::{AllowMethods, ConfigError, CorsConfig};
pub use runtime::*;

/// Derive [`RequiredFields`] from `#[cloudfn(required)]` field markers.
///
/// Field names follow `#[serde(rename = "...")]` and container-level
/// `#[serde(rename_all = "...")]`, so errors name the JSON key the client sent.
///
/// ```
/// use cloudfn::RequiredFields;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, RequiredFields)]
/// #[serde(rename_all = "camelCase")]
/// struct CreateCampaignReq {
///     #[cloudfn(required)]
///     campaign_name: String,
///     note: Option<String>,
/// }
///
/// let req: CreateCampaignReq = serde_json::from_str(r#"{"campaignName": ""}"#).unwrap();
/// assert_eq!(
///     req.check_required().unwrap_err().to_string(),
///     r#"missing required field: "campaignName""#,
/// );
/// ```
#[cfg(feature = "derive")]
pub use cloudfn_macros::RequiredFields;
