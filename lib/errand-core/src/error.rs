//! Error types for errand.

use derive_more::{Display, Error, From};

// ============================================================================
// Error Kind
// ============================================================================

/// Broad classification of an [`Error`].
///
/// `Option` and `Encoding` errors are raised before any network I/O happens;
/// `Transport` and `Read` errors happen after the request was dispatched and
/// are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// Malformed or unsupported option.
    #[display("option")]
    Option,
    /// Body could not be encoded (JSON, form, file attachment).
    #[display("encoding")]
    Encoding,
    /// DNS, connection, proxy, TLS, timeout or redirect failure.
    #[display("transport")]
    Transport,
    /// Response body could not be read or decoded.
    #[display("read")]
    Read,
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for errand operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// An option value is malformed (empty method, empty proxy map, ...).
    #[display("invalid option: {_0}")]
    #[from(skip)]
    InvalidOption(#[error(not(source))] String),

    /// An option value has a shape that is not recognized.
    #[display("unsupported option: {_0}")]
    #[from(skip)]
    UnsupportedOption(#[error(not(source))] String),

    /// A header entry has an invalid name or value.
    #[display("invalid header type: {_0}")]
    #[from(skip)]
    InvalidHeader(#[error(not(source))] String),

    /// A query parameter entry has an invalid value.
    #[display("invalid param type: {_0}")]
    #[from(skip)]
    InvalidParam(#[error(not(source))] String),

    /// A form field entry has an invalid value.
    #[display("invalid data type: {_0}")]
    #[from(skip)]
    InvalidForm(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// The request cannot be sent as configured (missing URL or method).
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// A percent-encoded string contains a malformed escape.
    #[display("invalid URL escape: {_0}")]
    #[from(skip)]
    InvalidEscape(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_html_form::ser::Error),

    /// A file attachment could not be opened or read.
    #[display("cannot read file '{name}': {source}")]
    #[from(skip)]
    File {
        /// File name or path of the attachment.
        name: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// Proxy dial or handshake errors.
    #[display("proxy error: {_0}")]
    #[from(skip)]
    Proxy(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Too many redirects.
    #[display("stopped after {max} redirects")]
    #[from(skip)]
    TooManyRedirects {
        /// Maximum allowed redirects.
        max: usize,
    },

    /// A redirect response carried an unusable `Location`.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),

    /// Response body could not be read.
    #[display("cannot read response body: {_0}")]
    #[from(skip)]
    BodyRead(#[error(not(source))] String),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid option error.
    #[must_use]
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption(message.into())
    }

    /// Create an unsupported option error.
    #[must_use]
    pub fn unsupported_option(message: impl Into<String>) -> Self {
        Self::UnsupportedOption(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a file attachment error.
    #[must_use]
    pub fn file(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::File {
            name: name.into(),
            source,
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a proxy error.
    #[must_use]
    pub fn proxy(message: impl Into<String>) -> Self {
        Self::Proxy(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid redirect error.
    #[must_use]
    pub fn invalid_redirect(message: impl Into<String>) -> Self {
        Self::InvalidRedirect(message.into())
    }

    /// Create a body read error.
    #[must_use]
    pub fn body_read(message: impl Into<String>) -> Self {
        Self::BodyRead(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOption(_)
            | Self::UnsupportedOption(_)
            | Self::InvalidHeader(_)
            | Self::InvalidParam(_)
            | Self::InvalidForm(_)
            | Self::InvalidUrl(_)
            | Self::InvalidEscape(_)
            | Self::InvalidRequest(_) => ErrorKind::Option,
            Self::JsonSerialization(_) | Self::FormSerialization(_) | Self::File { .. } => {
                ErrorKind::Encoding
            }
            Self::Connection(_)
            | Self::Proxy(_)
            | Self::Tls(_)
            | Self::Timeout
            | Self::TooManyRedirects { .. }
            | Self::InvalidRedirect(_) => ErrorKind::Transport,
            Self::BodyRead(_) | Self::JsonDeserialization { .. } => ErrorKind::Read,
        }
    }

    /// Returns `true` if this error was raised before any network I/O.
    #[must_use]
    pub const fn is_before_dispatch(&self) -> bool {
        matches!(self.kind(), ErrorKind::Option | ErrorKind::Encoding)
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if this is a proxy error.
    #[must_use]
    pub const fn is_proxy(&self) -> bool {
        matches!(self, Self::Proxy(_))
    }
}
