//! Prelude module for convenient imports.
//!
//! ```ignore
//! use errand::prelude::*;
//! ```

pub use crate::{
    Client, ClientConfig, CookieJar, Data, Error, FileSource, Headers, InMemoryFile, Json,
    LocalFile, Method, Params, Proxy, Request, RequestExt, RequestOption, Response, Result,
    Session, StatusCode, options,
};
