//! One-shot entry points.
//!
//! Each call builds a fresh [`Client`] with the default configuration, so no
//! connection or cookie outlives the call. Use a [`Session`](crate::Session)
//! to share cookies and connections.

use std::future::Future;

use http::Method;

use crate::client::resolve;
use crate::{Client, RequestOption, Response, Result};

macro_rules! verb_functions {
    ($($(#[$meta:meta])* $name:ident => $method:expr;)*) => {
        $(
            $(#[$meta])*
            pub fn $name(
                options: impl IntoIterator<Item = RequestOption>,
            ) -> impl Future<Output = Result<Response>> + Send {
                let request = resolve($method, options);
                async move {
                    let client = Client::new();
                    client.execute(request?).await
                }
            }
        )*
    };
}

verb_functions! {
    /// Send a GET request.
    ///
    /// ```ignore
    /// let response = errand::get(options!["https://httpbin.org/get", params]).await?;
    /// ```
    get => Some(Method::GET);
    /// Send a POST request.
    post => Some(Method::POST);
    /// Send a PUT request.
    put => Some(Method::PUT);
    /// Send a DELETE request.
    delete => Some(Method::DELETE);
    /// Send a PATCH request.
    patch => Some(Method::PATCH);
    /// Send a HEAD request.
    head => Some(Method::HEAD);
    /// Send an OPTIONS request.
    options => Some(Method::OPTIONS);
    /// Send a request whose method is taken from the options.
    ///
    /// ```ignore
    /// let response = errand::request(options!["PROPFIND", "https://dav.example.com/"]).await?;
    /// ```
    request => None;
}
