//! Body selection and serialization.

use bytes::Bytes;
use derive_more::Display;

use crate::{Form, Part, Request, Result};

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    #[display("application/json")]
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    #[display("application/x-www-form-urlencoded")]
    FormUrlEncoded,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

/// Which body representation was chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BodyKind {
    /// `multipart/form-data` with file parts and form fields.
    #[display("multipart")]
    Multipart,
    /// URL-encoded form fields.
    #[display("form")]
    Form,
    /// Compact JSON.
    #[display("json")]
    Json,
    /// Caller bytes sent verbatim.
    #[display("raw")]
    Raw,
    /// No body.
    #[display("empty")]
    Empty,
}

/// The encoded body with the content type it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    kind: BodyKind,
    content_type: Option<String>,
    bytes: Bytes,
}

impl EncodedBody {
    fn new(kind: BodyKind, content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            kind,
            content_type,
            bytes,
        }
    }

    /// Chosen representation.
    #[must_use]
    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// Content type to send unless the caller set one.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Body bytes.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Consume into the body bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Pick and encode exactly one body for a request.
///
/// Precedence: attachments (multipart, form fields become extra parts),
/// then form fields, then JSON, then raw bytes, else empty.
///
/// # Errors
///
/// Returns an error when an attachment cannot be read or the form or JSON
/// body cannot be serialized.
pub fn encode_body(request: &Request) -> Result<EncodedBody> {
    let body = if request.has_files() {
        let mut form = Form::new();
        for source in request.file_sources() {
            form = form.part(Part::from_source(&source)?);
        }
        for (name, value) in request.data().pairs() {
            form = form.field(name, value);
        }
        let (content_type, bytes) = form.into_body();
        EncodedBody::new(BodyKind::Multipart, Some(content_type), bytes)
    } else if !request.data().is_empty() {
        let pairs: Vec<_> = request.data().pairs().collect();
        EncodedBody::new(
            BodyKind::Form,
            Some(ContentType::FormUrlEncoded.to_string()),
            to_form(&pairs)?,
        )
    } else if let Some(json) = request.json() {
        EncodedBody::new(
            BodyKind::Json,
            Some(ContentType::Json.to_string()),
            to_json(json.value())?,
        )
    } else if let Some(raw) = request.raw() {
        EncodedBody::new(BodyKind::Raw, None, raw.clone())
    } else {
        EncodedBody::new(BodyKind::Empty, None, Bytes::new())
    };

    tracing::debug!(kind = %body.kind, size = body.bytes.len(), "request body encoded");
    Ok(body)
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use errand_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to form URL-encoded bytes.
///
/// Uses `serde_html_form`, which accepts a sequence of pairs as well as
/// structs with `Vec<T>` fields for repeated keys.
///
/// # Errors
///
/// Returns an error if form serialization fails.
///
/// # Example
///
/// ```
/// use errand_core::to_form;
///
/// let bytes = to_form(&[("tag", "a"), ("tag", "b c")]).expect("serialize");
/// assert_eq!(bytes.as_ref(), b"tag=a&tag=b+c");
/// ```
pub fn to_form<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// Uses `serde_path_to_error` so the error names the exact field that
/// failed to deserialize.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}
