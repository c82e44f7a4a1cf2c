//! Follow redirect middleware.
//!
//! This middleware automatically follows HTTP redirects (3xx responses with a
//! `Location` header), resolving relative locations against the current URL.
//! Every hop goes through the inner service again, so inner layers (cookies)
//! see each intermediate request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, LOCATION};
use http::{Method, StatusCode};
use tower::{Layer, Service};
use url::Url;

use crate::{Error, PreparedRequest, RawResponse, Result};

/// Default maximum number of redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Layer that follows HTTP redirects.
///
/// # Example
///
/// ```ignore
/// use errand::middleware::FollowRedirectLayer;
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(FollowRedirectLayer::new())
///     .service(client);
/// ```
#[derive(Debug, Clone)]
pub struct FollowRedirectLayer {
    max_redirects: usize,
}

impl Default for FollowRedirectLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowRedirectLayer {
    /// Create a new follow redirect layer with default max redirects (10).
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Create a new follow redirect layer with a custom max redirects.
    #[must_use]
    pub fn with_max_redirects(max_redirects: usize) -> Self {
        Self { max_redirects }
    }
}

impl<S> Layer<S> for FollowRedirectLayer {
    type Service = FollowRedirect<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FollowRedirect {
            inner,
            max_redirects: self.max_redirects,
        }
    }
}

/// Service that follows HTTP redirects.
#[derive(Debug, Clone)]
pub struct FollowRedirect<S> {
    inner: S,
    max_redirects: usize,
}

/// Check if a status code is a redirect.
fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Determine the method for the redirected request.
///
/// - 307, 308: preserve the original method
/// - 301, 302, 303: switch to GET, except HEAD which stays HEAD
fn redirect_method(status: StatusCode, original: &Method) -> Method {
    match status.as_u16() {
        307 | 308 => original.clone(),
        _ if *original == Method::HEAD => Method::HEAD,
        _ => Method::GET,
    }
}

/// Resolve a redirect Location URL relative to the original request URL.
fn resolve_redirect_url(base_url: &Url, location: &str) -> Result<Url> {
    base_url
        .join(location)
        .map_err(|err| Error::invalid_redirect(format!("cannot resolve Location {location:?}: {err}")))
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// Build the request for the next hop, or `None` when `response` ends the chain.
fn next_request(request: PreparedRequest, response: &RawResponse) -> Result<Option<PreparedRequest>> {
    let Some(location) = response.headers().get(LOCATION) else {
        tracing::debug!(status = %response.status(), "redirect without Location, returning it");
        return Ok(None);
    };
    let location = location
        .to_str()
        .map_err(|err| Error::invalid_redirect(format!("Location header is not valid UTF-8: {err}")))?;

    let (method, url, mut headers, body) = request.into_parts();
    let next_url = resolve_redirect_url(&url, location)?;
    let next_method = redirect_method(response.status(), &method);

    let body = if matches!(response.status().as_u16(), 307 | 308) {
        body
    } else {
        headers.remove(CONTENT_TYPE);
        headers.remove(CONTENT_LENGTH);
        bytes::Bytes::new()
    };

    if !same_origin(&url, &next_url) {
        headers.remove(AUTHORIZATION);
        headers.remove(COOKIE);
        headers.remove(HOST);
    }

    tracing::debug!(from = %url, to = %next_url, method = %next_method, "following redirect");
    Ok(Some(PreparedRequest::new(next_method, next_url, headers, body)))
}

impl<S> Service<PreparedRequest> for FollowRedirect<S>
where
    S: Service<PreparedRequest, Response = RawResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = RawResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: PreparedRequest) -> Self::Future {
        let mut inner = self.inner.clone();
        let max_redirects = self.max_redirects;

        Box::pin(async move {
            let mut current_request = request;
            let mut redirects = 0;

            loop {
                let response = inner.call(current_request.clone()).await?;

                if !is_redirect(response.status()) {
                    return Ok(response);
                }

                let Some(next) = next_request(current_request, &response)? else {
                    return Ok(response);
                };

                if redirects >= max_redirects {
                    return Err(Error::TooManyRedirects { max: max_redirects });
                }

                current_request = next;
                redirects += 1;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{HeaderMap, HeaderValue};

    use super::*;

    fn request(method: Method, url: &str) -> PreparedRequest {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        headers.insert(COOKIE, HeaderValue::from_static("a=1"));
        PreparedRequest::new(
            method,
            Url::parse(url).expect("url"),
            headers,
            Bytes::from_static(b"{}"),
        )
    }

    fn redirect(status: u16, location: Option<&'static str>) -> RawResponse {
        let mut headers = HeaderMap::new();
        if let Some(location) = location {
            headers.insert(LOCATION, HeaderValue::from_static(location));
        }
        RawResponse::new(
            StatusCode::from_u16(status).expect("status"),
            Url::parse("https://example.com/").expect("url"),
            headers,
            Bytes::new(),
        )
    }

    #[test]
    fn default_max_redirects() {
        let layer = FollowRedirectLayer::new();
        assert_eq!(layer.max_redirects, DEFAULT_MAX_REDIRECTS);
    }

    #[test]
    fn custom_max_redirects() {
        let layer = FollowRedirectLayer::with_max_redirects(5);
        assert_eq!(layer.max_redirects, 5);
    }

    #[test]
    fn redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            assert!(is_redirect(StatusCode::from_u16(status).expect("status")));
        }
        for status in [200, 300, 304, 404, 500] {
            assert!(!is_redirect(StatusCode::from_u16(status).expect("status")));
        }
    }

    #[test]
    fn redirect_method_rules() {
        assert_eq!(redirect_method(StatusCode::MOVED_PERMANENTLY, &Method::POST), Method::GET);
        assert_eq!(redirect_method(StatusCode::FOUND, &Method::PUT), Method::GET);
        assert_eq!(redirect_method(StatusCode::SEE_OTHER, &Method::HEAD), Method::HEAD);
        assert_eq!(
            redirect_method(StatusCode::TEMPORARY_REDIRECT, &Method::POST),
            Method::POST
        );
        assert_eq!(
            redirect_method(StatusCode::PERMANENT_REDIRECT, &Method::PATCH),
            Method::PATCH
        );
    }

    #[test]
    fn resolve_urls() {
        let base = Url::parse("https://example.com/old/path").expect("base url");
        let cases = [
            ("https://other.com/new", "https://other.com/new"),
            ("/new/path", "https://example.com/new/path"),
            ("sibling", "https://example.com/old/sibling"),
            ("//cdn.example.com/x", "https://cdn.example.com/x"),
        ];
        for (location, expected) in cases {
            let resolved = resolve_redirect_url(&base, location).expect("resolve");
            assert_eq!(resolved.as_str(), expected, "{location}");
        }
    }

    #[test]
    fn see_other_drops_body() {
        let next = next_request(
            request(Method::POST, "https://example.com/form"),
            &redirect(303, Some("/done")),
        )
        .expect("next")
        .expect("redirect");

        assert_eq!(next.method(), Method::GET);
        assert_eq!(next.url().as_str(), "https://example.com/done");
        assert!(next.body().is_empty());
        assert!(next.headers().get(CONTENT_TYPE).is_none());
        assert!(next.headers().get(AUTHORIZATION).is_some());
    }

    #[test]
    fn temporary_redirect_keeps_body() {
        let next = next_request(
            request(Method::PUT, "https://example.com/item"),
            &redirect(307, Some("/item/2")),
        )
        .expect("next")
        .expect("redirect");

        assert_eq!(next.method(), Method::PUT);
        assert_eq!(next.body().as_ref(), b"{}");
        assert!(next.headers().get(CONTENT_TYPE).is_some());
    }

    #[test]
    fn cross_host_strips_credentials() {
        let next = next_request(
            request(Method::GET, "https://example.com/"),
            &redirect(302, Some("https://other.com/")),
        )
        .expect("next")
        .expect("redirect");

        assert!(next.headers().get(AUTHORIZATION).is_none());
        assert!(next.headers().get(COOKIE).is_none());
    }

    #[test]
    fn missing_location_ends_chain() {
        let next = next_request(
            request(Method::GET, "https://example.com/"),
            &redirect(302, None),
        )
        .expect("next");
        assert!(next.is_none());
    }

    #[test]
    fn unresolvable_location_is_a_transport_error() {
        let err = next_request(
            request(Method::GET, "https://example.com/"),
            &redirect(302, Some("http://[::1")),
        )
        .expect_err("bad location");

        assert!(matches!(err, Error::InvalidRedirect(_)), "unexpected error: {err}");
        assert!(!err.is_before_dispatch());
    }

    #[test]
    fn non_utf8_location_is_a_transport_error() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LOCATION,
            HeaderValue::from_bytes(b"/caf\xE9").expect("opaque header value"),
        );
        let response = RawResponse::new(
            StatusCode::FOUND,
            Url::parse("https://example.com/").expect("url"),
            headers,
            Bytes::new(),
        );

        let err = next_request(request(Method::GET, "https://example.com/"), &response)
            .expect_err("bad location");
        assert!(matches!(err, Error::InvalidRedirect(_)), "unexpected error: {err}");
    }
}
