//! Default request headers and merging of caller headers.

use http::header::{CONNECTION, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::{Error, FieldValue, Headers, Result};

/// User agent sent unless the caller overrides it.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Header set every request starts from: the default user agent and
/// `Connection: close`.
#[must_use]
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    headers
}

/// Merge caller headers onto [`default_headers`].
///
/// A single value replaces whatever the name held; a list replaces the
/// whole value list. Names are case-insensitive.
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] when a name or value is not a legal
/// HTTP header token.
pub fn assemble_headers(caller: &Headers) -> Result<HeaderMap> {
    let mut headers = default_headers();
    for (name, value) in caller.iter() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| Error::InvalidHeader(format!("{name}: {err}")))?;
        match value {
            FieldValue::Single(value) => {
                headers.insert(name.clone(), header_value(&name, value)?);
            }
            FieldValue::Multi(values) => {
                headers.remove(&name);
                for value in values {
                    headers.append(name.clone(), header_value(&name, value)?);
                }
            }
        }
    }
    Ok(headers)
}

fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| Error::InvalidHeader(format!("{name}: {err}")))
}
