//! Core types for the errand requests-style HTTP client.
//!
//! This crate turns a list of loosely typed options into a wire-ready request
//! without doing any I/O besides reading file attachments:
//! - [`RequestOption`] and the [`options!`] macro - option values
//! - [`Request`] and [`RequestBuilder`] - option resolution
//! - [`Headers`], [`Params`], [`Data`] - multi-valued string maps
//! - [`Proxy`] - per-request proxy map and selection
//! - [`FileSource`], [`LocalFile`], [`InMemoryFile`] - attachments
//! - [`Form`] and [`Part`] - multipart bodies, with [`detect_content_type`]
//! - [`encode_body`] - body precedence and encoding
//! - [`PreparedRequest`], [`RawResponse`] and [`Response`] - transport boundary
//! - [`Error`] and [`Result`] - Error handling
//!
//! The transport lives in the `errand` crate.

mod body;
mod error;
mod escape;
mod fields;
mod file;
mod headers;
mod multipart;
mod option;
pub mod prelude;
mod prepared;
mod proxy;
mod request;
mod response;
mod sniff;

pub use body::{BodyKind, ContentType, EncodedBody, encode_body, from_json, to_form, to_json};
pub use error::{Error, ErrorKind, Result};
pub use escape::{url_decode, url_encode, url_encode_fully};
pub use fields::{Data, FieldMap, FieldValue, Headers, Params};
pub use file::{DEFAULT_FIELD_NAME, FileReader, FileSource, InMemoryFile, LocalFile};
pub use headers::{DEFAULT_USER_AGENT, assemble_headers, default_headers};
pub use multipart::{Form, Part};
pub use option::{Json, RequestOption};
pub use prepared::{PreparedRequest, RawResponse};
pub use proxy::{Proxy, SOCKS5};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use sniff::detect_content_type;

// Re-export http crate types for methods, status codes and headers
pub use http::{Method, StatusCode, header};
