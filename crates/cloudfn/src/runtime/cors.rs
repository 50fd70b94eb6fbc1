//! CORS header negotiation for preflight and main requests.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::{AllowMethods, ConfigError, CorsConfig};

/// Seconds browsers may cache a preflight answer.
pub const CORS_MAX_AGE: &str = "3600";

/// Per-service CORS policy with a concurrency-safe cache of accepted origins.
///
/// Built once at startup and shared (typically behind an [`Arc`]) by every
/// request. Construction fails on an empty origin list, so a policy can never
/// be applied without at least one origin.
///
/// # Origin matching
///
/// A request's `Origin` is echoed back when any configured origin is a
/// *substring* of it. This is permissive: `"example.com"` also accepts
/// `"https://evil-example.com.attacker.net"`. Configure full origins
/// (`"https://app.example.com"`) to narrow the match. Anything that doesn't
/// match gets the first configured origin.
///
/// # Examples
///
/// ```
/// use axum::http::{Method, Request, StatusCode};
/// use axum::response::Response;
/// use cloudfn::CorsPolicy;
///
/// let policy = CorsPolicy::new(["example.com"]).unwrap();
/// let request = Request::builder()
///     .method(Method::OPTIONS)
///     .header("origin", "https://app.example.com")
///     .body(())
///     .unwrap();
/// let mut response = Response::default();
///
/// assert!(policy.apply(&request, &mut response));
/// assert_eq!(response.status(), StatusCode::NO_CONTENT);
/// assert_eq!(
///     response.headers()["access-control-allow-origin"],
///     "https://app.example.com",
/// );
/// ```
#[derive(Debug)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    default_origin: HeaderValue,
    allow_methods: HeaderValue,
    cache: RwLock<HashSet<String>>,
}

impl CorsPolicy {
    /// Build a policy from allowed origins, using the default method list.
    ///
    /// # Errors
    ///
    /// See [`from_config`](Self::from_config).
    pub fn new<I, S>(allowed_origins: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_config(CorsConfig {
            allowed_origins: allowed_origins.into_iter().map(Into::into).collect(),
            allow_methods: AllowMethods::default(),
        })
    }

    /// Build a policy from a [`CorsConfig`].
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptyOrigins`] if no origins are configured
    /// - [`ConfigError::EmptyOrigin`] if an origin is the empty string
    /// - [`ConfigError::InvalidOrigin`] if an origin isn't a valid header value
    /// - [`ConfigError::InvalidMethod`] if the method list can't be rendered
    pub fn from_config(config: CorsConfig) -> Result<Self, ConfigError> {
        let Some(first) = config.allowed_origins.first() else {
            return Err(ConfigError::EmptyOrigins);
        };
        let default_origin =
            HeaderValue::from_str(first).map_err(|_| ConfigError::InvalidOrigin {
                origin: first.clone(),
            })?;

        for (index, origin) in config.allowed_origins.iter().enumerate() {
            if origin.is_empty() {
                return Err(ConfigError::EmptyOrigin { index });
            }
            if HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::InvalidOrigin {
                    origin: origin.clone(),
                });
            }
        }

        Ok(Self {
            allow_methods: config.allow_methods.header_value()?,
            default_origin,
            allowed_origins: config.allowed_origins,
            cache: RwLock::new(HashSet::new()),
        })
    }

    /// Replace the `Access-Control-Allow-Methods` value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMethod`] if the list can't be rendered.
    pub fn with_allow_methods(mut self, methods: &AllowMethods) -> Result<Self, ConfigError> {
        self.allow_methods = methods.header_value()?;
        Ok(self)
    }

    /// Configured origins, in priority order.
    #[must_use]
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    /// Set CORS headers on `response` for `request`.
    ///
    /// For an `OPTIONS` request the status is set to `204 No Content` and
    /// `true` is returned: the caller must stop and send `response` as is.
    /// Otherwise returns `false` and the caller continues normal handling.
    pub fn apply<B>(&self, request: &axum::http::Request<B>, response: &mut Response) -> bool {
        let origin = self.resolve_origin(request.headers());
        self.write_headers(origin, response.headers_mut());

        if request.method() == Method::OPTIONS {
            *response.status_mut() = StatusCode::NO_CONTENT;
            return true;
        }
        false
    }

    /// Pick the `Access-Control-Allow-Origin` value for a request.
    fn resolve_origin(&self, headers: &HeaderMap) -> HeaderValue {
        let Some(request_origin) = headers.get(ORIGIN) else {
            return self.default_origin.clone();
        };
        let Ok(origin) = request_origin.to_str() else {
            return self.default_origin.clone();
        };

        if self.is_cached(origin) {
            return request_origin.clone();
        }

        if self
            .allowed_origins
            .iter()
            .any(|allowed| origin.contains(allowed.as_str()))
        {
            self.remember(origin);
            return request_origin.clone();
        }

        tracing::trace!(origin, "origin not allowed; answering with default origin");
        self.default_origin.clone()
    }

    fn is_cached(&self, origin: &str) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(origin)
    }

    fn remember(&self, origin: &str) {
        let inserted = self
            .cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(origin.to_owned());
        if inserted {
            tracing::debug!(origin, "cached allowed CORS origin");
        }
    }

    fn write_headers(&self, origin: HeaderValue, headers: &mut HeaderMap) {
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(CORS_MAX_AGE),
        );
        headers.insert(VARY, HeaderValue::from_static("Origin"));
    }
}

/// Axum middleware applying a shared [`CorsPolicy`].
///
/// Preflight requests are answered with `204` without reaching the inner
/// handler. Other responses get the same CORS headers added.
///
/// ```
/// use std::sync::Arc;
///
/// use axum::{middleware, routing::post, Router};
/// use cloudfn::{cors_middleware, CorsPolicy};
///
/// let policy = Arc::new(CorsPolicy::new(["example.com"]).unwrap());
/// let app: Router = Router::new()
///     .route("/", post(|| async { "ok" }))
///     .layer(middleware::from_fn_with_state(policy, cors_middleware));
/// ```
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = policy.resolve_origin(request.headers());

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        policy.write_headers(origin, response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    policy.write_headers(origin, response.headers_mut());
    response
}

/// Allow every origin.
///
/// Preflight requests get the full permissive header set and `204 No Content`,
/// and `true` is returned. Main requests only get
/// `Access-Control-Allow-Credentials` and `Access-Control-Allow-Origin: *`.
pub fn apply_wildcard_cors<B>(request: &axum::http::Request<B>, response: &mut Response) -> bool {
    let any = HeaderValue::from_static("*");
    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, any.clone());

    if request.method() == Method::OPTIONS {
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, any.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, any);
        headers.insert(
            ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(CORS_MAX_AGE),
        );
        *response.status_mut() = StatusCode::NO_CONTENT;
        return true;
    }
    false
}
