//! Request context and path helpers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::ORIGIN;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, Method, Request, Uri};

/// Headers consulted for the client IP, in priority order.
///
/// `cf-connecting-ip` is set by Cloudflare, `x-real-ip` by most reverse
/// proxies. Only the first hop of `x-forwarded-for` is used.
pub const CLIENT_IP_HEADERS: &[&str] = &["cf-connecting-ip", "x-real-ip", "x-forwarded-for"];

/// Return [`CLIENT_IP_HEADERS`] as typed [`HeaderName`] values.
///
/// # Example
///
/// ```
/// use cloudfn::client_ip_header_names;
///
/// let names = client_ip_header_names();
/// assert_eq!(names[0], "cf-connecting-ip");
/// ```
#[must_use]
pub fn client_ip_header_names() -> [HeaderName; 3] {
    [
        HeaderName::from_static("cf-connecting-ip"),
        HeaderName::from_static("x-real-ip"),
        HeaderName::from_static("x-forwarded-for"),
    ]
}

/// Return the id from a path of the form `/<id>`.
///
/// Strips a single leading `/`. Functions are usually mounted so that the
/// remaining path is the resource id.
///
/// ```
/// use axum::http::Request;
/// use cloudfn::path_id;
///
/// let request = Request::get("/abc-123").body(()).unwrap();
/// assert_eq!(path_id(&request), "abc-123");
/// ```
#[must_use]
pub fn path_id<B>(request: &Request<B>) -> &str {
    let path = request.uri().path();
    path.strip_prefix('/').unwrap_or(path)
}

/// Per-request information handlers commonly need.
///
/// Extract it directly in an Axum handler, or build it with [`new_ctx`].
/// Authentication is not resolved here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    method: Method,
    path: String,
    origin: Option<String>,
    client_ip: Option<String>,
}

impl RequestContext {
    fn build(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            method: method.clone(),
            path: uri.path().to_owned(),
            origin: header_str(headers, &ORIGIN).map(str::to_owned),
            client_ip: client_ip(headers).map(str::to_owned),
        }
    }

    /// Build from request parts.
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        Self::build(&parts.method, &parts.uri, &parts.headers)
    }

    /// Request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path with its leading `/` removed; see [`path_id`].
    #[must_use]
    pub fn path_id(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }

    /// `Origin` header, if present and valid UTF-8.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Client IP from the first populated [`CLIENT_IP_HEADERS`] entry.
    #[must_use]
    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }
}

/// Build the [`RequestContext`] of a request.
///
/// ```
/// use axum::http::Request;
/// use cloudfn::new_ctx;
///
/// let request = Request::post("/campaigns")
///     .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
///     .body(())
///     .unwrap();
/// let ctx = new_ctx(&request);
/// assert_eq!(ctx.path(), "/campaigns");
/// assert_eq!(ctx.client_ip(), Some("203.0.113.9"));
/// ```
#[must_use]
pub fn new_ctx<B>(request: &Request<B>) -> RequestContext {
    RequestContext::build(request.method(), request.uri(), request.headers())
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

// Values that aren't valid UTF-8 are treated as absent.
fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn client_ip(headers: &HeaderMap) -> Option<&str> {
    client_ip_header_names().iter().find_map(|name| {
        let value = header_str(headers, name)?;
        let first = value.split(',').next().unwrap_or(value).trim();
        (!first.is_empty()).then_some(first)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().method(Method::PUT).uri("/items/42?x=1");
        for &(name, value) in headers {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn client_ip_header_names_matches_const() {
        let names = client_ip_header_names();
        assert_eq!(names.len(), CLIENT_IP_HEADERS.len());
        for (name, &expected) in names.iter().zip(CLIENT_IP_HEADERS.iter()) {
            assert_eq!(name.as_str(), expected);
        }
    }

    #[test]
    fn path_id_strips_one_slash() {
        assert_eq!(path_id(&request(&[])), "items/42");
        let root = Request::get("/").body(()).unwrap();
        assert_eq!(path_id(&root), "");
        let double = Request::get("//x").body(()).unwrap();
        assert_eq!(path_id(&double), "/x");
    }

    #[test]
    fn context_from_plain_request() {
        let ctx = new_ctx(&request(&[]));
        assert_eq!(ctx.method(), Method::PUT);
        assert_eq!(ctx.path(), "/items/42");
        assert_eq!(ctx.path_id(), "items/42");
        assert_eq!(ctx.origin(), None);
        assert_eq!(ctx.client_ip(), None);
    }

    #[test]
    fn context_captures_origin() {
        let ctx = new_ctx(&request(&[("origin", "https://a.com")]));
        assert_eq!(ctx.origin(), Some("https://a.com"));
    }

    #[test]
    fn cloudflare_ip_wins() {
        let ctx = new_ctx(&request(&[
            ("x-forwarded-for", "1.1.1.1"),
            ("x-real-ip", "2.2.2.2"),
            ("cf-connecting-ip", "3.3.3.3"),
        ]));
        assert_eq!(ctx.client_ip(), Some("3.3.3.3"));
    }

    #[test]
    fn real_ip_before_forwarded_for() {
        let ctx = new_ctx(&request(&[
            ("x-forwarded-for", "1.1.1.1"),
            ("x-real-ip", "2.2.2.2"),
        ]));
        assert_eq!(ctx.client_ip(), Some("2.2.2.2"));
    }

    #[test]
    fn forwarded_for_first_hop() {
        let ctx = new_ctx(&request(&[("x-forwarded-for", " 9.9.9.9 , 10.0.0.1")]));
        assert_eq!(ctx.client_ip(), Some("9.9.9.9"));
    }

    #[test]
    fn client_ip_uses_every_listed_header() {
        for (name, &expected) in client_ip_header_names().iter().zip(CLIENT_IP_HEADERS) {
            assert_eq!(name.as_str(), expected);
            let ctx = new_ctx(&request(&[(expected, "7.7.7.7")]));
            assert_eq!(ctx.client_ip(), Some("7.7.7.7"), "{name}");
        }
    }

    #[test]
    fn blank_headers_are_skipped() {
        let ctx = new_ctx(&request(&[("x-real-ip", "  "), ("x-forwarded-for", ",5.5.5.5")]));
        assert_eq!(ctx.client_ip(), None);
    }

    #[tokio::test]
    async fn extractor_matches_new_ctx() {
        let request = request(&[("origin", "b.com")]);
        let expected = new_ctx(&request);
        let (mut parts, ()) = request.into_parts();
        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx, expected);
    }
}
