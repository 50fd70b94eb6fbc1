//! CORS configuration, deserializable from the embedding service's config.
//!
//! # File format
//!
//! ```yaml
//! # Ordered; the first entry is the default Allow-Origin value.
//! allowed_origins:
//!   - https://app.example.com
//!   - example.org
//!
//! # Either "*" or a list of verbs. Defaults to
//! # GET, POST, PUT, DELETE, PATCH, OPTIONS.
//! allow_methods: [GET, POST]
//! ```

use std::path::Path;

use axum::http::{HeaderValue, Method};
use serde::Deserialize;

/// Errors produced while loading or validating CORS configuration.
///
/// These are startup failures: a service that gets one should refuse to
/// serve rather than answer requests with a broken policy.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The YAML document did not match [`CorsConfig`].
    #[error(transparent)]
    Yaml(#[from] serde_yaml_ng::Error),

    /// No allowed origins were configured.
    #[error("cors: missing allowed origins")]
    EmptyOrigins,

    /// An allowed origin is the empty string, which would match every origin.
    #[error("cors: allowed origin at index {index} is empty")]
    EmptyOrigin {
        /// Position in `allowed_origins`.
        index: usize,
    },

    /// An allowed origin cannot be sent as a header value.
    #[error("cors: allowed origin {origin:?} is not a valid header value")]
    InvalidOrigin {
        /// The offending origin.
        origin: String,
    },

    /// An entry of `allow_methods` is not an HTTP method token.
    #[error("cors: invalid method {0:?}")]
    InvalidMethod(String),
}

/// Value of `Access-Control-Allow-Methods`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "MethodsRepr")]
pub enum AllowMethods {
    /// `*`
    Any,
    /// An explicit verb list, rendered comma-separated.
    List(Vec<Method>),
}

impl AllowMethods {
    /// Parse `"*"` or a comma-separated verb list such as `"GET, POST"`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMethod`] for a token that is not a method.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        if value.trim() == "*" {
            return Ok(Self::Any);
        }
        Self::from_names(value.split(','))
    }

    fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, ConfigError> {
        names
            .into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                Method::from_bytes(name.as_bytes())
                    .map_err(|_| ConfigError::InvalidMethod(name.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::List)
    }

    pub(crate) fn header_value(&self) -> Result<HeaderValue, ConfigError> {
        match self {
            Self::Any => Ok(HeaderValue::from_static("*")),
            Self::List(methods) => {
                let joined = methods
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                HeaderValue::from_str(&joined).map_err(|_| ConfigError::InvalidMethod(joined))
            }
        }
    }
}

impl Default for AllowMethods {
    fn default() -> Self {
        Self::List(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MethodsRepr {
    One(String),
    Many(Vec<String>),
}

impl TryFrom<MethodsRepr> for AllowMethods {
    type Error = ConfigError;

    fn try_from(repr: MethodsRepr) -> Result<Self, Self::Error> {
        match repr {
            MethodsRepr::One(value) => Self::parse(&value),
            MethodsRepr::Many(names) if names.len() == 1 && names[0].trim() == "*" => Ok(Self::Any),
            MethodsRepr::Many(names) => Self::from_names(names.iter().map(String::as_str)),
        }
    }
}

/// CORS settings supplied by the embedding service at startup.
///
/// Turn it into a [`CorsPolicy`](crate::CorsPolicy) with
/// [`CorsPolicy::from_config`](crate::CorsPolicy::from_config), which
/// validates it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origin fragments, in priority order.
    pub allowed_origins: Vec<String>,

    /// `Access-Control-Allow-Methods` value.
    pub allow_methods: AllowMethods,
}

impl CorsConfig {
    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the document is malformed or a method
    /// is invalid.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read and parse a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file can't be read, or
    /// [`ConfigError::Yaml`] if it doesn't parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
