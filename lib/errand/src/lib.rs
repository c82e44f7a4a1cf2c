//! Requests-style HTTP client for Rust.
//!
//! Build a request from a loosely typed list of options and send it:
//!
//! ```ignore
//! use errand::prelude::*;
//!
//! let params = Params::new().with("q", "rust");
//! let response = errand::get(options!["https://httpbin.org/get", params, 5_000]).await?;
//! println!("{} {}", response.status(), response.text());
//! ```
//!
//! Options are classified by shape: a string starting with `http://` or
//! `https://` is the URL, any other string is the method, an integer is the
//! timeout in milliseconds, a boolean allows or forbids redirects, and typed
//! maps ([`Headers`], [`Params`], [`Data`], [`Json`], [`Proxy`]) or files
//! ([`LocalFile`], [`InMemoryFile`]) set the corresponding part. Exactly one
//! body is sent: files, then form data, then JSON, then raw bytes.
//!
//! The free functions ([`get`], [`post`], ...) use a fresh [`Client`] per
//! call. A [`Session`] keeps a client and a [`CookieJar`] across calls.

mod api;
mod client;
mod config;
mod connector;
mod jar;
pub mod middleware;
pub mod prelude;
mod reader;
mod session;

pub use api::{delete, get, head, options, patch, post, put, request};
pub use client::{BoxedService, Client, ClientBuilder, RequestExt, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use connector::{ProxyConnector, ProxyStream, https_connector};
pub use jar::CookieJar;
pub use session::Session;

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use errand_core::{
    BodyKind, ContentType, DEFAULT_USER_AGENT, Data, EncodedBody, Error, ErrorKind, FieldMap,
    FieldValue, FileSource, Form, Headers, InMemoryFile, Json, LocalFile, Params, Part,
    PreparedRequest, Proxy, RawResponse, Request, RequestBuilder, RequestOption, Response, Result,
    detect_content_type, encode_body, from_json, to_form, to_json, url_decode, url_encode,
    url_encode_fully,
};

// Re-export http types for methods, status codes and headers
pub use errand_core::{Method, StatusCode, header};

// Re-export the option list macro
pub use errand_core::options;

// Re-export crates used in public signatures
pub use bytes;
pub use cookie;
pub use url;
