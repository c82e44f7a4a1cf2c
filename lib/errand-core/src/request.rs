//! The request aggregate and its resolution from an option list.
//!
//! # Example
//!
//! ```
//! use errand_core::{Data, Request};
//!
//! let request = Request::builder()
//!     .url("https://api.example.com/login")
//!     .method("POST")
//!     .data(Data::new().with("user", "alice"))
//!     .build()
//!     .expect("valid request");
//!
//! let prepared = request.prepare().expect("prepared");
//! assert_eq!(prepared.body().as_ref(), b"user=alice");
//! ```

use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use url::Url;

use crate::option::classify_text;
use crate::{
    Data, Error, FileSource, Headers, InMemoryFile, Json, LocalFile, Params, PreparedRequest,
    Proxy, RequestOption, Result, assemble_headers, encode_body,
};

/// Everything needed to send one request, as resolved from options.
///
/// Several body candidates may be set at once; [`encode_body`] picks one
/// when the request is prepared.
#[derive(Debug, Clone)]
pub struct Request {
    method: Option<Method>,
    url: Option<Url>,
    headers: Headers,
    params: Params,
    data: Data,
    json: Option<Json>,
    raw: Option<Bytes>,
    allow_redirects: bool,
    timeout: Duration,
    proxy: Option<Proxy>,
    files: Vec<FileSource>,
    file_local: Option<LocalFile>,
    file_bytes: Option<InMemoryFile>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: None,
            url: None,
            headers: Headers::default(),
            params: Params::default(),
            data: Data::default(),
            json: None,
            raw: None,
            allow_redirects: true,
            timeout: Duration::ZERO,
            proxy: None,
            files: Vec::new(),
            file_local: None,
            file_bytes: None,
        }
    }
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Resolve an option list. Later options of the same kind win.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed option: an empty method string, an
    /// unparsable URL, or a proxy map without a usable entry.
    pub fn from_options(options: impl IntoIterator<Item = RequestOption>) -> Result<Self> {
        let mut request = Self::default();
        for option in options {
            request.apply(option)?;
        }
        Ok(request)
    }

    fn apply(&mut self, option: RequestOption) -> Result<()> {
        match option {
            RequestOption::Text(text) => return self.apply(classify_text(text)?),
            RequestOption::Url(url) => self.url = Some(url),
            RequestOption::Method(method) => self.method = Some(method),
            RequestOption::Headers(headers) => self.headers = headers,
            RequestOption::Params(params) => self.params = params,
            RequestOption::Data(data) => self.data = data,
            RequestOption::Json(json) => self.json = Some(json),
            RequestOption::Proxy(proxy) => {
                proxy.validate()?;
                self.proxy = Some(proxy);
            }
            RequestOption::Files(files) => self.files = files,
            RequestOption::LocalFile(file) => self.file_local = Some(file),
            RequestOption::InMemoryFile(file) => self.file_bytes = Some(file),
            RequestOption::Timeout(timeout) => self.timeout = timeout,
            RequestOption::AllowRedirects(allow) => self.allow_redirects = allow,
            RequestOption::Raw(raw) => self.raw = Some(raw),
        }
        Ok(())
    }

    /// Copy of this request with the method replaced.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// HTTP method, if set.
    #[must_use]
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Request URL, if set. Query parameters are not applied yet.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Caller headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Query parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Form fields.
    #[must_use]
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// JSON body candidate.
    #[must_use]
    pub fn json(&self) -> Option<&Json> {
        self.json.as_ref()
    }

    /// Raw body candidate.
    #[must_use]
    pub fn raw(&self) -> Option<&Bytes> {
        self.raw.as_ref()
    }

    /// Whether redirects are followed (default `true`).
    #[must_use]
    pub fn allow_redirects(&self) -> bool {
        self.allow_redirects
    }

    /// Timeout; zero means the client default.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Proxy map.
    #[must_use]
    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref()
    }

    /// Proxy URL for this request, when a proxy map is set.
    #[must_use]
    pub fn selected_proxy(&self) -> Option<&str> {
        let scheme = self.url.as_ref().map_or("http", Url::scheme);
        self.proxy.as_ref().and_then(|proxy| proxy.select(scheme))
    }

    /// Every attachment in upload order: the list, then the in-memory
    /// slot, then the local-file slot.
    #[must_use]
    pub fn file_sources(&self) -> Vec<FileSource> {
        self.files
            .iter()
            .cloned()
            .chain(self.file_bytes.clone().map(FileSource::from))
            .chain(self.file_local.clone().map(FileSource::from))
            .collect()
    }

    /// Returns `true` if any attachment is present.
    #[must_use]
    pub fn has_files(&self) -> bool {
        !self.files.is_empty() || self.file_bytes.is_some() || self.file_local.is_some()
    }

    /// Turn this request into its wire form: query parameters appended,
    /// headers merged onto the defaults and one body encoded.
    ///
    /// # Errors
    ///
    /// Fails when the method or URL is missing, a header is invalid, or the
    /// body cannot be encoded (including unreadable attachments).
    pub fn prepare(&self) -> Result<PreparedRequest> {
        let method = self
            .method
            .clone()
            .ok_or_else(|| Error::invalid_request("method is not set"))?;
        let mut url = self
            .url
            .clone()
            .ok_or_else(|| Error::invalid_request("URL is not set"))?;

        let mut pairs = self.params.pairs().peekable();
        if pairs.peek().is_some() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let mut headers = assemble_headers(&self.headers)?;
        let body = encode_body(self)?;
        if let Some(content_type) = body.content_type()
            && !headers.contains_key(CONTENT_TYPE)
        {
            let value = HeaderValue::from_str(content_type)
                .map_err(|err| Error::InvalidHeader(format!("{CONTENT_TYPE}: {err}")))?;
            headers.insert(CONTENT_TYPE, value);
        }

        Ok(PreparedRequest::new(method, url, headers, body.into_bytes()))
    }
}

/// Typed builder for [`Request`], one method per option kind.
///
/// Values go through the same resolution as an option list, so
/// `builder().url(..)` and `from_options([.. url ..])` are equivalent.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    options: Vec<RequestOption>,
}

impl RequestBuilder {
    /// Add an arbitrary option.
    #[must_use]
    pub fn option(mut self, option: impl Into<RequestOption>) -> Self {
        self.options.push(option.into());
        self
    }

    /// Sets the URL (`http://` or `https://`).
    #[must_use]
    pub fn url(self, url: impl Into<String>) -> Self {
        self.option(url.into())
    }

    /// Sets the method.
    #[must_use]
    pub fn method(self, method: impl Into<String>) -> Self {
        self.option(method.into())
    }

    /// Sets the caller headers.
    #[must_use]
    pub fn headers(self, headers: Headers) -> Self {
        self.option(headers)
    }

    /// Sets the query parameters.
    #[must_use]
    pub fn params(self, params: Params) -> Self {
        self.option(params)
    }

    /// Sets the form fields.
    #[must_use]
    pub fn data(self, data: Data) -> Self {
        self.option(data)
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn json(self, json: impl Into<Json>) -> Self {
        self.option(json.into())
    }

    /// Sets the raw body.
    #[must_use]
    pub fn raw(self, raw: impl Into<Bytes>) -> Self {
        self.option(raw.into())
    }

    /// Sets the proxy map.
    #[must_use]
    pub fn proxy(self, proxy: Proxy) -> Self {
        self.option(proxy)
    }

    /// Sets the attachment list.
    #[must_use]
    pub fn files(self, files: Vec<FileSource>) -> Self {
        self.option(files)
    }

    /// Sets the single local-file attachment.
    #[must_use]
    pub fn local_file(self, file: LocalFile) -> Self {
        self.option(file)
    }

    /// Sets the single in-memory attachment.
    #[must_use]
    pub fn in_memory_file(self, file: InMemoryFile) -> Self {
        self.option(file)
    }

    /// Sets the timeout.
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        self.option(timeout)
    }

    /// Sets whether redirects are followed.
    #[must_use]
    pub fn allow_redirects(self, allow: bool) -> Self {
        self.option(allow)
    }

    /// Resolve the collected options.
    ///
    /// # Errors
    ///
    /// Same as [`Request::from_options`].
    pub fn build(self) -> Result<Request> {
        Request::from_options(self.options)
    }
}

#[cfg(test)]
mod tests {
    use http::header::{CONNECTION, USER_AGENT};
    use serde_json::json;

    use super::*;
    use crate::{DEFAULT_USER_AGENT, options};

    #[test]
    fn url_and_method_by_prefix_not_order() {
        let request = Request::from_options(options!["DELETE", "https://example.com/item"])
            .expect("options");
        assert_eq!(request.method(), Some(&Method::DELETE));
        assert_eq!(
            request.url().map(Url::as_str),
            Some("https://example.com/item")
        );
    }

    #[test]
    fn defaults() {
        let request = Request::from_options(options![]).expect("options");
        assert!(request.allow_redirects());
        assert_eq!(request.timeout(), Duration::ZERO);
        assert!(request.method().is_none());
        assert!(request.proxy().is_none());
        assert!(!request.has_files());
    }

    #[test]
    fn last_option_wins() {
        let request = Request::from_options(options![
            "GET",
            "POST",
            Params::new().with("a", "1"),
            Params::new().with("b", "2"),
            100,
            2_000,
            false,
            true,
        ])
        .expect("options");
        assert_eq!(request.method(), Some(&Method::POST));
        assert_eq!(request.params().first("a"), None);
        assert_eq!(request.params().first("b"), Some("2"));
        assert_eq!(request.timeout(), Duration::from_secs(2));
        assert!(request.allow_redirects());
    }

    #[test]
    fn empty_method_fails() {
        let err = Request::from_options(options!["https://example.com", ""]).expect_err("empty");
        assert_eq!(err.to_string(), "invalid option: method can not be empty");
        assert!(err.is_before_dispatch());
    }

    #[test]
    fn empty_proxy_fails() {
        let proxy: Proxy = [("http", ""), ("https", "")].into_iter().collect();
        let err = Request::from_options(options![proxy]).expect_err("empty proxy");
        assert_eq!(err.to_string(), "invalid option: proxy can not be empty");
    }

    #[test]
    fn socks5_proxy_applies_to_every_scheme() {
        let request = Request::builder()
            .url("https://example.com")
            .proxy(Proxy::new().socks5("socks5://h:1080"))
            .build()
            .expect("request");
        assert_eq!(request.selected_proxy(), Some("socks5://h:1080"));
    }

    #[test]
    fn file_order() {
        let request = Request::builder()
            .local_file(LocalFile::new("/tmp/local.txt"))
            .in_memory_file(InMemoryFile::new("memory.txt", "m"))
            .files(vec![
                InMemoryFile::new("first.txt", "1").into(),
                InMemoryFile::new("second.txt", "2").into(),
            ])
            .build()
            .expect("request");
        let names: Vec<_> = request
            .file_sources()
            .iter()
            .map(|f| f.file_name().into_owned())
            .collect();
        assert_eq!(
            names,
            ["first.txt", "second.txt", "memory.txt", "local.txt"]
        );
    }

    #[test]
    fn prepare_requires_method_and_url() {
        let err = Request::from_options(options!["https://example.com"])
            .and_then(|r| r.prepare())
            .expect_err("no method");
        assert!(matches!(err, Error::InvalidRequest(_)));

        let err = Request::from_options(options!["GET"])
            .and_then(|r| r.prepare())
            .expect_err("no url");
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn prepare_appends_params() {
        let request = Request::from_options(options![
            "GET",
            "https://example.com/search?lang=en",
            Params::new().with("q", "rust http").with("tag", ["a", "b"]),
        ])
        .expect("options");
        let prepared = request.prepare().expect("prepared");
        assert_eq!(
            prepared.url().as_str(),
            "https://example.com/search?lang=en&q=rust+http&tag=a&tag=b"
        );
    }

    #[test]
    fn prepare_without_params_keeps_url() {
        let request = Request::from_options(options![
            "GET",
            "https://example.com/plain",
            Params::new().with("empty", Vec::<String>::new()),
        ])
        .expect("options");
        let prepared = request.prepare().expect("prepared");
        assert_eq!(prepared.url().as_str(), "https://example.com/plain");
    }

    #[test]
    fn prepare_sets_default_headers_and_content_type() {
        let request = Request::from_options(options![
            "POST",
            "https://example.com",
            Json::new(json!({"a": 1})),
        ])
        .expect("options");
        let prepared = request.prepare().expect("prepared");
        assert_eq!(prepared.headers()[USER_AGENT], DEFAULT_USER_AGENT);
        assert_eq!(prepared.headers()[CONNECTION], "close");
        assert_eq!(prepared.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(prepared.body().as_ref(), br#"{"a":1}"#);
    }

    #[test]
    fn caller_content_type_is_kept() {
        let request = Request::from_options(options![
            "POST",
            "https://example.com",
            Headers::new().with("content-type", "application/vnd.api+json"),
            Json::new(json!({"a": 1})),
        ])
        .expect("options");
        let prepared = request.prepare().expect("prepared");
        assert_eq!(
            prepared.headers()[CONTENT_TYPE],
            "application/vnd.api+json"
        );
        assert_eq!(prepared.headers().get_all(CONTENT_TYPE).iter().count(), 1);
    }

    #[test]
    fn raw_body_has_no_default_content_type() {
        let request = Request::from_options(options!["PUT", "https://example.com", b"\x00\x01"])
            .expect("options");
        let prepared = request.prepare().expect("prepared");
        assert!(prepared.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(prepared.body().as_ref(), b"\x00\x01");
    }

    #[test]
    fn with_method_overrides() {
        let request = Request::from_options(options!["POST", "https://example.com"])
            .expect("options")
            .with_method(Method::GET);
        assert_eq!(request.method(), Some(&Method::GET));
    }
}
