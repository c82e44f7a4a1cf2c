//! HTTP client implementation using hyper-util.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use http_body_util::Full;
use hyper_rustls::HttpsConnector;
use hyper_util::{client::legacy, rt::TokioExecutor};
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};
use tower_service::Service;

use crate::{
    CookieJar, Error, PreparedRequest, Proxy, RawResponse, Request, RequestOption, Response, Result,
    config::{ClientConfig, ClientConfigBuilder},
    connector::{ProxyConnector, https_connector},
    middleware::{CookieLayer, FollowRedirectLayer, LogLevel, LoggingLayer},
    reader::read_response,
};

// ============================================================================
// Type-Erased Service for Middleware Composition
// ============================================================================

/// Type-erased transport stack for one request.
pub type BoxedService = BoxCloneService<PreparedRequest, RawResponse, Error>;

/// Future type for Tower Service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

// ============================================================================
// Raw Client (internal, used for direct hyper access)
// ============================================================================

/// Raw HTTP client using hyper-util (internal implementation).
#[derive(Clone)]
struct RawClient {
    inner: legacy::Client<HttpsConnector<ProxyConnector>, Full<Bytes>>,
}

impl RawClient {
    fn new(config: &ClientConfig, proxy: Option<&Proxy>) -> Self {
        let connector = https_connector(proxy, config.connect_timeout);

        let inner = legacy::Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self { inner }
    }

    /// Build a hyper request from a prepared request.
    fn build_hyper_request(request: PreparedRequest) -> Result<(http::Request<Full<Bytes>>, url::Url)> {
        let (method, url, headers, body) = request.into_parts();

        let mut target = url.clone();
        target.set_fragment(None);

        let mut http_request = http::Request::builder()
            .method(method)
            .uri(target.as_str())
            .body(Full::new(body))
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        *http_request.headers_mut() = headers;

        Ok((http_request, url))
    }

    async fn execute(self, request: PreparedRequest) -> Result<RawResponse> {
        let (hyper_request, url) = Self::build_hyper_request(request)?;

        let response = self
            .inner
            .request(hyper_request)
            .await
            .map_err(|err| map_transport_error(&err))?;

        read_response(response, url).await
    }

}

/// Map a failed exchange to a transport error by walking its source chain.
fn map_transport_error(err: &(dyn std::error::Error + 'static)) -> Error {
    let mut msg = err.to_string();
    let mut tls = is_tls_failure(err);
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(Error::Proxy(message)) = cause.downcast_ref::<Error>() {
            return Error::proxy(message.clone());
        }
        tls |= is_tls_failure(cause);
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }

    if tls {
        Error::tls(msg)
    } else {
        Error::connection(msg)
    }
}

/// Handshake failures surface as (possibly nested) `io::Error`s wrapping a `rustls::Error`.
fn is_tls_failure(cause: &(dyn std::error::Error + 'static)) -> bool {
    if cause.is::<rustls::Error>() {
        return true;
    }
    match cause
        .downcast_ref::<std::io::Error>()
        .and_then(std::io::Error::get_ref)
    {
        Some(inner) => is_tls_failure(inner),
        None => false,
    }
}

impl std::fmt::Debug for RawClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawClient").finish_non_exhaustive()
    }
}

impl Service<PreparedRequest> for RawClient {
    type Response = RawResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: PreparedRequest) -> Self::Future {
        let client = self.clone();
        Box::pin(client.execute(request))
    }
}

// ============================================================================
// Public Client
// ============================================================================

macro_rules! verb_methods {
    ($($(#[$meta:meta])* $name:ident => $method:expr;)*) => {
        $(
            $(#[$meta])*
            pub fn $name(
                &self,
                options: impl IntoIterator<Item = RequestOption>,
            ) -> impl Future<Output = Result<Response>> + Send + '_ {
                self.send($method, options)
            }
        )*
    };
}
pub(crate) use verb_methods;

/// HTTP client using hyper-util with connection pooling, TLS and proxies.
///
/// Each call builds its transport stack from the request: logging, then
/// redirect following when the request allows it, then the cookie jar when
/// one is attached. Requests with a proxy get a dedicated connection pool.
///
/// # Example
///
/// ```ignore
/// use errand::{Client, options};
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .timeout(Duration::from_secs(5))
///     .build();
///
/// let response = client.get(options!["https://httpbin.org/get"]).await?;
/// ```
#[derive(Clone)]
pub struct Client {
    raw: RawClient,
    config: ClientConfig,
    jar: Option<Arc<CookieJar>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("cookies", &self.jar.is_some())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new client with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration and no cookie jar.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            raw: RawClient::new(&config, None),
            config,
            jar: None,
        }
    }

    /// This client, sending and storing cookies using `jar`.
    #[must_use]
    pub fn with_cookie_jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.jar = Some(jar);
        self
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Cookie jar used by this client, if any.
    #[must_use]
    pub fn cookie_jar(&self) -> Option<&Arc<CookieJar>> {
        self.jar.as_ref()
    }

    fn service_for(&self, request: &Request) -> BoxedService {
        let raw = match request.proxy() {
            Some(proxy) => {
                tracing::debug!(first_hop = ?request.selected_proxy(), "routing request through proxy map");
                RawClient::new(&self.config, Some(proxy))
            }
            None => self.raw.clone(),
        };

        let mut service = BoxCloneService::new(raw);
        if let Some(jar) = &self.jar {
            service = BoxCloneService::new(CookieLayer::new(Arc::clone(jar)).layer(service));
        }
        if request.allow_redirects() {
            let redirects = FollowRedirectLayer::with_max_redirects(self.config.max_redirects);
            service = BoxCloneService::new(redirects.layer(service));
        }
        BoxCloneService::new(LoggingLayer::with_level(self.config.log_level).layer(service))
    }

    /// Send a resolved request.
    ///
    /// # Errors
    ///
    /// Option and encoding errors are returned before any I/O. Transport
    /// errors ([`Error::Timeout`], [`Error::Connection`], [`Error::Proxy`],
    /// [`Error::Tls`], [`Error::TooManyRedirects`], [`Error::InvalidRedirect`])
    /// and body read errors are never retried.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let prepared = request.prepare()?;
        let service = self.service_for(&request);
        let timeout = self.config.effective_timeout(request.timeout());

        let raw = tokio::time::timeout(timeout, service.oneshot(prepared))
            .await
            .map_err(|_| {
                tracing::debug!(?timeout, "request timed out");
                Error::Timeout
            })??;

        Ok(Response::from_raw(raw, request))
    }

    /// Resolve `options` and send them, forcing `method` when given.
    pub fn send(
        &self,
        method: Option<Method>,
        options: impl IntoIterator<Item = RequestOption>,
    ) -> impl Future<Output = Result<Response>> + Send + '_ {
        let request = resolve(method, options);
        async move { self.execute(request?).await }
    }

    verb_methods! {
        /// Send a GET request.
        get => Some(Method::GET);
        /// Send a POST request.
        post => Some(Method::POST);
        /// Send a PUT request.
        put => Some(Method::PUT);
        /// Send a DELETE request.
        delete => Some(Method::DELETE);
        /// Send a PATCH request.
        patch => Some(Method::PATCH);
        /// Send a HEAD request.
        head => Some(Method::HEAD);
        /// Send an OPTIONS request.
        options => Some(Method::OPTIONS);
        /// Send a request whose method is taken from the options.
        request => None;
    }
}

/// Resolve an option list, forcing `method` when given.
pub(crate) fn resolve(
    method: Option<Method>,
    options: impl IntoIterator<Item = RequestOption>,
) -> Result<Request> {
    let request = Request::from_options(options)?;
    Ok(match method {
        Some(method) => request.with_method(method),
        None => request,
    })
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

impl Service<Request> for Client {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let client = self.clone();
        Box::pin(async move { client.execute(request).await })
    }
}

/// Send a [`Request`] with a fresh default [`Client`].
pub trait RequestExt {
    /// Send this request.
    fn send(self) -> impl Future<Output = Result<Response>> + Send;
}

impl RequestExt for Request {
    fn send(self) -> impl Future<Output = Result<Response>> + Send {
        async move { Client::new().execute(self).await }
    }
}

/// Builder for [`Client`].
///
/// # Example
///
/// ```ignore
/// use errand::{Client, CookieJar};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .timeout(Duration::from_secs(30))
///     .max_redirects(3)
///     .cookie_jar(Arc::new(CookieJar::new()))
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfigBuilder,
    jar: Option<Arc<CookieJar>>,
}

impl ClientBuilder {
    /// Set the timeout used when a request does not set its own.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Set the maximum number of redirects to follow.
    #[must_use]
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config = self.config.max_redirects(max);
        self
    }

    /// Set the request/response log level.
    #[must_use]
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config = self.config.log_level(level);
        self
    }

    /// Send and store cookies using `jar`.
    #[must_use]
    pub fn cookie_jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.jar = Some(jar);
        self
    }

    /// Build the client.
    #[must_use]
    pub fn build(self) -> Client {
        let client = Client::with_config(self.config.build());
        match self.jar {
            Some(jar) => client.with_cookie_jar(jar),
            None => client,
        }
    }
}

#[cfg(test)]
mod tests {
    use errand_core::options;

    use super::*;

    #[test]
    fn client_default() {
        let client = Client::new();
        assert_eq!(client.config().timeout, Duration::from_secs(30));
        assert!(client.cookie_jar().is_none());
    }

    #[test]
    fn client_builder() {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_per_host(16)
            .max_redirects(2)
            .cookie_jar(Arc::new(CookieJar::new()))
            .build();

        assert_eq!(client.config().timeout, Duration::from_secs(60));
        assert_eq!(client.config().pool_idle_per_host, 16);
        assert_eq!(client.config().max_redirects, 2);
        assert!(client.cookie_jar().is_some());
    }

    #[test]
    fn refused_connection_is_not_tls() {
        let err = std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "tcp connect error to tls.example.com: connection refused",
        );
        let mapped = map_transport_error(&err);
        assert!(mapped.is_connection(), "unexpected error: {mapped}");
    }

    #[derive(Debug)]
    struct ConnectFailed(Box<dyn std::error::Error + Send + Sync>);

    impl std::fmt::Display for ConnectFailed {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("client error (Connect)")
        }
    }

    impl std::error::Error for ConnectFailed {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(self.0.as_ref())
        }
    }

    #[test]
    fn rustls_failure_is_tls() {
        let handshake = std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer),
        );
        let err = ConnectFailed(Box::new(std::io::Error::other(handshake)));
        let mapped = map_transport_error(&err);
        assert!(matches!(mapped, Error::Tls(_)), "unexpected error: {mapped}");
    }

    #[test]
    fn proxy_failure_in_chain_is_kept() {
        let err = ConnectFailed(Box::new(Error::proxy("cannot reach proxy")));
        let mapped = map_transport_error(&err);
        assert!(mapped.is_proxy(), "unexpected error: {mapped}");
    }

    #[test]
    fn client_is_debug() {
        let client = Client::new();
        let debug = format!("{client:?}");
        assert!(debug.contains("Client"));
    }

    #[test]
    fn verb_forces_method() {
        let request = resolve(Some(Method::DELETE), options!["https://example.com", "POST"])
            .expect("request");
        assert_eq!(request.method(), Some(&Method::DELETE));

        let request = resolve(None, options!["https://example.com", "POST"]).expect("request");
        assert_eq!(request.method(), Some(&Method::POST));
    }

    #[tokio::test]
    async fn empty_method_fails_before_dispatch() {
        let client = Client::new();
        let err = client
            .request(options!["https://example.com", ""])
            .await
            .expect_err("empty method");
        assert!(matches!(err, Error::InvalidOption(_)));
        assert!(err.is_before_dispatch());
    }

    #[tokio::test]
    async fn missing_url_fails_before_dispatch() {
        let err = Client::new()
            .get(options![])
            .await
            .expect_err("missing url");
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn proxy_error_is_unwrapped() {
        let err = Error::proxy("cannot reach proxy");
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
        let found = boxed.downcast_ref::<Error>();
        assert!(matches!(found, Some(Error::Proxy(_))));
    }
}
