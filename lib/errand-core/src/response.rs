//! HTTP response handling.
//!
//! A [`Response`] is fully buffered: status, headers, cookies and body are
//! available synchronously, together with the [`Request`] that produced it.
//!
//! # Example
//!
//! ```ignore
//! let response = errand::get(options!["https://api.example.com/user"]).await?;
//! let user: User = response.json()?;
//! ```

use std::borrow::Cow;

use bytes::Bytes;
use cookie::Cookie;
use http::header::{CONTENT_LENGTH, SET_COOKIE};
use http::{HeaderMap, StatusCode};
use url::Url;

use crate::{RawResponse, Request, Result, from_json};

/// HTTP response with status, headers, cookies and body.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    url: Url,
    headers: HeaderMap,
    cookies: Vec<Cookie<'static>>,
    content_length: Option<u64>,
    body: Bytes,
    request: Request,
}

impl Response {
    /// Build a response from what the transport returned.
    ///
    /// Malformed `Set-Cookie` values are skipped.
    #[must_use]
    pub fn from_raw(raw: RawResponse, request: Request) -> Self {
        let (status, url, headers, body) = raw.into_parts();
        let cookies = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| Cookie::parse(value.to_owned()).ok())
            .collect();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok());

        Self {
            status,
            url,
            headers,
            cookies,
            content_length,
            body,
            request,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Final URL, after redirects.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Cookies set by this response.
    #[must_use]
    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.cookies
    }

    /// Declared `Content-Length`; `None` when unknown.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Raw body bytes.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonDeserialization`](crate::Error::JsonDeserialization)
    /// naming the path of the failing field.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        from_json(&self.body)
    }

    /// The request that produced this response.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Consume into the body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Status is 3xx.
    #[must_use]
    pub fn is_redirection(&self) -> bool {
        self.status.is_redirection()
    }

    /// Status is 4xx.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Status is 5xx.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}
