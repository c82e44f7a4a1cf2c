//! Sessions: a reusable client with a shared cookie jar.

use std::future::Future;
use std::sync::Arc;

use http::Method;

use crate::client::verb_methods;
use crate::{Client, ClientConfig, CookieJar, Request, RequestOption, Response, Result};

/// Long-lived holder of a cookie jar and a transport client.
///
/// Cookies set by any response are sent on later requests to matching URLs,
/// including requests made concurrently from other tasks. Clones share the
/// same client and jar.
///
/// # Example
///
/// ```ignore
/// use errand::{Session, options};
///
/// let session = Session::new();
/// session.post(options!["https://example.com/login", data]).await?;
/// let profile = session.get(options!["https://example.com/profile"]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    jar: Arc<CookieJar>,
}

impl Session {
    /// Session with the default configuration and an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Session with a custom configuration and an empty jar.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_jar(config, Arc::new(CookieJar::new()))
    }

    /// Session using an existing jar.
    #[must_use]
    pub fn with_jar(config: ClientConfig, jar: Arc<CookieJar>) -> Self {
        Self {
            client: Client::with_config(config).with_cookie_jar(Arc::clone(&jar)),
            jar,
        }
    }

    /// The session cookie jar.
    #[must_use]
    pub fn jar(&self) -> &Arc<CookieJar> {
        &self.jar
    }

    /// The underlying client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a resolved request within this session.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.client.execute(request).await
    }

    /// Resolve `options` and send them, forcing `method` when given.
    pub fn send(
        &self,
        method: Option<Method>,
        options: impl IntoIterator<Item = RequestOption>,
    ) -> impl Future<Output = Result<Response>> + Send + '_ {
        self.client.send(method, options)
    }

    verb_methods! {
        /// Send a GET request within this session.
        get => Some(Method::GET);
        /// Send a POST request within this session.
        post => Some(Method::POST);
        /// Send a PUT request within this session.
        put => Some(Method::PUT);
        /// Send a DELETE request within this session.
        delete => Some(Method::DELETE);
        /// Send a PATCH request within this session.
        patch => Some(Method::PATCH);
        /// Send a HEAD request within this session.
        head => Some(Method::HEAD);
        /// Send an OPTIONS request within this session.
        options => Some(Method::OPTIONS);
        /// Send a request within this session, method taken from the options.
        request => None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
