//! Wire-level request and response, exchanged with the transport.

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use url::Url;

/// A request ready to be written: final URL, merged headers, encoded body.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl PreparedRequest {
    /// Creates a prepared request.
    #[must_use]
    pub fn new(method: Method, url: Url, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL, query included.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, HeaderMap, Bytes) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// A buffered response as returned by the transport, before cookies are
/// parsed and the originating request is attached.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl RawResponse {
    /// Creates a raw response.
    #[must_use]
    pub fn new(status: StatusCode, url: Url, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            url,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// URL that produced this response.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume into (status, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, Url, HeaderMap, Bytes) {
        (self.status, self.url, self.headers, self.body)
    }
}
