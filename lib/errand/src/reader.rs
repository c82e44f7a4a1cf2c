//! Buffers a hyper response into a [`RawResponse`].

use http_body_util::BodyExt;
use hyper::body::Incoming;
use url::Url;

use crate::{Error, RawResponse, Result};

/// Read the whole body of `response`, received for `url`.
///
/// No partial body is ever returned: a read failure yields
/// [`Error::BodyRead`].
pub(crate) async fn read_response(response: http::Response<Incoming>, url: Url) -> Result<RawResponse> {
    let (parts, body) = response.into_parts();

    let body = body
        .collect()
        .await
        .map_err(|err| Error::body_read(err.to_string()))?
        .to_bytes();

    tracing::trace!(status = %parts.status, bytes = body.len(), "response body read");

    Ok(RawResponse::new(parts.status, url, parts.headers, body))
}
