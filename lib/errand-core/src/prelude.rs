//! Prelude module for convenient imports.
//!
//! ```ignore
//! use errand_core::prelude::*;
//! ```

pub use crate::{
    Data, Error, FileSource, Headers, InMemoryFile, Json, LocalFile, Params, Proxy, Request,
    RequestOption, Response, Result, options,
};
