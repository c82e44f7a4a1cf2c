//! Cookie middleware: sends jar cookies and stores `Set-Cookie` responses.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::HeaderValue;
use http::header::{COOKIE, SET_COOKIE};
use tower::{Layer, Service};

use crate::{CookieJar, Error, PreparedRequest, RawResponse, Result};

/// Layer that attaches a [`CookieJar`] to every request.
#[derive(Debug, Clone)]
pub struct CookieLayer {
    jar: Arc<CookieJar>,
}

impl CookieLayer {
    /// Create a cookie layer using `jar`.
    #[must_use]
    pub fn new(jar: Arc<CookieJar>) -> Self {
        Self { jar }
    }
}

impl<S> Layer<S> for CookieLayer {
    type Service = Cookies<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Cookies {
            inner,
            jar: Arc::clone(&self.jar),
        }
    }
}

/// Service that reads cookies from, and stores cookies into, a shared jar.
#[derive(Debug, Clone)]
pub struct Cookies<S> {
    inner: S,
    jar: Arc<CookieJar>,
}

fn merge_cookie_header(request: &mut PreparedRequest, jar_value: &HeaderValue) {
    let merged = match request.headers().get(COOKIE) {
        Some(existing) => {
            let mut value = existing.as_bytes().to_vec();
            value.extend_from_slice(b"; ");
            value.extend_from_slice(jar_value.as_bytes());
            HeaderValue::from_bytes(&value).ok()
        }
        None => Some(jar_value.clone()),
    };
    if let Some(merged) = merged {
        request.headers_mut().insert(COOKIE, merged);
    }
}

impl<S> Service<PreparedRequest> for Cookies<S>
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

    fn call(&mut self, mut request: PreparedRequest) -> Self::Future {
        if let Some(value) = self.jar.cookie_header(request.url()) {
            merge_cookie_header(&mut request, &value);
        }

        let mut inner = self.inner.clone();
        let jar = Arc::clone(&self.jar);
        Box::pin(async move {
            let response = inner.call(request).await?;
            jar.store_response_cookies(response.headers().get_all(SET_COOKIE).iter(), response.url());
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};
    use tower::{ServiceExt, service_fn};
    use url::Url;

    use super::*;

    fn request(url: &str, cookie: Option<&'static str>) -> PreparedRequest {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie {
            headers.insert(COOKIE, HeaderValue::from_static(cookie));
        }
        PreparedRequest::new(Method::GET, Url::parse(url).expect("url"), headers, Bytes::new())
    }

    /// Echoes the request `Cookie` header in the body and sets `seen=1`.
    async fn echo(request: PreparedRequest) -> Result<RawResponse> {
        let body = request
            .headers()
            .get(COOKIE)
            .map(|value| Bytes::copy_from_slice(value.as_bytes()))
            .unwrap_or_default();
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, HeaderValue::from_static("seen=1; Path=/"));
        Ok(RawResponse::new(StatusCode::OK, request.url().clone(), headers, body))
    }

    #[tokio::test]
    async fn stores_then_sends() {
        let jar = Arc::new(CookieJar::new());
        let service = CookieLayer::new(Arc::clone(&jar)).layer(service_fn(echo));

        let first = service
            .clone()
            .oneshot(request("http://example.com/", None))
            .await
            .expect("first");
        assert!(first.body().is_empty());

        let second = service
            .oneshot(request("http://example.com/next", None))
            .await
            .expect("second");
        assert_eq!(second.body().as_ref(), b"seen=1");
    }

    #[tokio::test]
    async fn merges_with_caller_cookie() {
        let jar = Arc::new(CookieJar::new());
        jar.add_cookie_str("jar=1; Path=/", &Url::parse("http://example.com/").expect("url"));
        let service = CookieLayer::new(jar).layer(service_fn(echo));

        let response = service
            .oneshot(request("http://example.com/", Some("caller=2")))
            .await
            .expect("response");
        assert_eq!(response.body().as_ref(), b"caller=2; jar=1");
    }
}
