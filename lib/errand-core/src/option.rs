//! Request options.
//!
//! Every value a caller can pass when building a request converts into a
//! [`RequestOption`]. The [`options!`](crate::options) macro applies those
//! conversions to a comma-separated list.
//!
//! | Value                                   | Option                             |
//! |-----------------------------------------|------------------------------------|
//! | `&str`/`String` starting with `http(s)://` | URL                             |
//! | any other string                        | method (empty is an error)         |
//! | [`Headers`], [`Params`], [`Data`]       | headers, query params, form fields |
//! | [`Json`]                                | JSON body                          |
//! | [`Proxy`]                               | proxy map                          |
//! | `Vec<FileSource>`, [`LocalFile`], [`InMemoryFile`] | file attachments        |
//! | integer, [`Duration`]                   | timeout (integers are milliseconds)|
//! | `bool`                                  | follow redirects                   |
//! | `Vec<u8>`, `&[u8]`, [`Bytes`]           | raw body                           |

use std::time::Duration;

use bytes::Bytes;
use http::Method;
use serde_json::Value;
use url::Url;

use crate::fields::describe;
use crate::{Data, Error, FileSource, Headers, InMemoryFile, LocalFile, Params, Proxy, Result};

/// A JSON request body.
#[derive(Debug, Clone, PartialEq)]
pub struct Json(Value);

impl Json {
    /// Wrap an already built JSON value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Serialize any value into a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonSerialization`] if the value cannot be represented as JSON.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value).map(Self).map_err(Into::into)
    }

    /// The JSON value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for Json {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// One entry of a request option list.
#[derive(Debug, Clone)]
pub enum RequestOption {
    /// A URL when prefixed with `http://` or `https://`, a method otherwise.
    Text(String),
    /// Request URL.
    Url(Url),
    /// Request method.
    Method(Method),
    /// Caller headers.
    Headers(Headers),
    /// Query parameters.
    Params(Params),
    /// Form fields.
    Data(Data),
    /// JSON body.
    Json(Json),
    /// Proxy map.
    Proxy(Proxy),
    /// List of file attachments.
    Files(Vec<FileSource>),
    /// Single attachment read from disk.
    LocalFile(LocalFile),
    /// Single attachment held in memory.
    InMemoryFile(InMemoryFile),
    /// Overall timeout; zero means the client default.
    Timeout(Duration),
    /// Whether redirects are followed.
    AllowRedirects(bool),
    /// Raw body bytes.
    Raw(Bytes),
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RequestOption {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    &str => Text,
    String => Text,
    Url => Url,
    Method => Method,
    Headers => Headers,
    Params => Params,
    Data => Data,
    Json => Json,
    Proxy => Proxy,
    Vec<FileSource> => Files,
    LocalFile => LocalFile,
    InMemoryFile => InMemoryFile,
    Duration => Timeout,
    bool => AllowRedirects,
    Bytes => Raw,
    Vec<u8> => Raw,
}

impl From<&String> for RequestOption {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<&[u8]> for RequestOption {
    fn from(value: &[u8]) -> Self {
        Self::Raw(Bytes::copy_from_slice(value))
    }
}

impl<const N: usize> From<&[u8; N]> for RequestOption {
    fn from(value: &[u8; N]) -> Self {
        Self::Raw(Bytes::copy_from_slice(value))
    }
}

impl From<u64> for RequestOption {
    fn from(millis: u64) -> Self {
        Self::Timeout(Duration::from_millis(millis))
    }
}

impl From<u32> for RequestOption {
    fn from(millis: u32) -> Self {
        Self::from(u64::from(millis))
    }
}

impl From<i64> for RequestOption {
    fn from(millis: i64) -> Self {
        Self::from(u64::try_from(millis).unwrap_or(0))
    }
}

impl From<i32> for RequestOption {
    fn from(millis: i32) -> Self {
        Self::from(i64::from(millis))
    }
}

impl TryFrom<Value> for RequestOption {
    type Error = Error;

    /// Convert a dynamic value: strings, booleans and integer millisecond
    /// timeouts. Maps are ambiguous (headers, params, form or JSON) and must
    /// be wrapped in their typed container first.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Bool(allow) => Ok(Self::AllowRedirects(allow)),
            Value::Number(number) => match (number.as_u64(), number.as_i64()) {
                (Some(millis), _) => Ok(Self::from(millis)),
                (None, Some(millis)) => Ok(Self::from(millis)),
                _ => Err(Error::unsupported_option(format!("non-integer number {number}"))),
            },
            other => Err(Error::unsupported_option(describe(&other))),
        }
    }
}

/// Build a `Vec<RequestOption>` from heterogeneous values.
///
/// ```
/// use errand_core::{Headers, Request, options};
///
/// let request = Request::from_options(options![
///     "https://example.com/search",
///     "POST",
///     Headers::new().with("Accept", "application/json"),
///     1500,
///     false,
/// ])
/// .expect("valid options");
///
/// assert_eq!(request.method().map(|m| m.as_str()), Some("POST"));
/// assert!(!request.allow_redirects());
/// ```
#[macro_export]
macro_rules! options {
    ($($option:expr),* $(,)?) => {
        ::std::vec![$($crate::RequestOption::from($option)),*]
    };
}

/// Parse a text option into a URL or a method, by prefix.
pub(crate) fn classify_text(text: String) -> Result<RequestOption> {
    if text.starts_with("http://") || text.starts_with("https://") {
        return Ok(RequestOption::Url(Url::parse(&text)?));
    }
    if text.is_empty() {
        return Err(Error::invalid_option("method can not be empty"));
    }
    Method::from_bytes(text.as_bytes())
        .map(RequestOption::Method)
        .map_err(|_| Error::invalid_option(format!("invalid method {text:?}")))
}
