//! Concurrent cookie jar shared by the requests of a [`Session`](crate::Session).

use std::sync::{PoisonError, RwLock};

use bytes::Bytes;
use http::HeaderValue;
use url::Url;

/// Cookie jar backed by [`cookie_store::CookieStore`].
///
/// The jar does its own locking: share it behind an `Arc` and use it from
/// any number of tasks.
#[derive(Debug, Default)]
pub struct CookieJar {
    store: RwLock<cookie_store::CookieStore>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the `Set-Cookie` values received from `url`.
    ///
    /// Values that do not parse as cookies are ignored.
    pub fn store_response_cookies<'a>(
        &self,
        set_cookies: impl Iterator<Item = &'a HeaderValue>,
        url: &Url,
    ) {
        let cookies: Vec<_> = set_cookies
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| cookie::Cookie::parse(value.to_owned()).ok())
            .collect();
        if cookies.is_empty() {
            return;
        }

        tracing::trace!(%url, count = cookies.len(), "storing cookies");
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .store_response_cookies(cookies.into_iter(), url);
    }

    /// Add a single cookie, as if `url` had sent it in a `Set-Cookie` header.
    pub fn add_cookie_str(&self, cookie: &str, url: &Url) {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            self.store_response_cookies(std::iter::once(&value), url);
        }
    }

    /// `Cookie` header value for a request to `url`, if any cookie matches.
    #[must_use]
    pub fn cookie_header(&self, url: &Url) -> Option<HeaderValue> {
        let value = self
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");

        if value.is_empty() {
            return None;
        }
        HeaderValue::from_maybe_shared(Bytes::from(value)).ok()
    }

    /// Value of the cookie `name` that would be sent to `url`.
    #[must_use]
    pub fn get(&self, url: &Url, name: &str) -> Option<String> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_request_values(url)
            .find(|(cookie, _)| *cookie == name)
            .map(|(_, value)| value.to_owned())
    }

    /// Remove every cookie.
    pub fn clear(&self) {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn url(value: &str) -> Url {
        Url::parse(value).expect("url")
    }

    #[test]
    fn stores_and_returns_cookies() {
        let jar = CookieJar::new();
        let set_cookies = [
            HeaderValue::from_static("session=abc; Path=/"),
            HeaderValue::from_static("theme=dark"),
            HeaderValue::from_static("=broken"),
        ];
        jar.store_response_cookies(set_cookies.iter(), &url("http://example.com/account/login"));

        let header = jar
            .cookie_header(&url("http://example.com/"))
            .expect("cookie header");
        let header = header.to_str().expect("ascii");
        assert!(header.contains("session=abc"));
        assert_eq!(jar.get(&url("http://example.com/"), "theme"), None);
        assert_eq!(
            jar.get(&url("http://example.com/account/settings"), "theme").as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn cookies_are_host_scoped() {
        let jar = CookieJar::new();
        jar.add_cookie_str("token=1; Path=/", &url("http://a.example.com/"));

        assert!(jar.cookie_header(&url("http://a.example.com/x")).is_some());
        assert!(jar.cookie_header(&url("http://b.example.com/x")).is_none());
    }

    #[test]
    fn clear_removes_everything() {
        let jar = CookieJar::new();
        jar.add_cookie_str("token=1; Path=/", &url("http://example.com/"));
        jar.clear();
        assert!(jar.cookie_header(&url("http://example.com/")).is_none());
    }

    #[test]
    fn shared_between_threads() {
        let jar = Arc::new(CookieJar::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let jar = Arc::clone(&jar);
                std::thread::spawn(move || {
                    jar.add_cookie_str(&format!("c{i}={i}; Path=/"), &url("http://example.com/"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread");
        }

        for i in 0..8 {
            assert_eq!(
                jar.get(&url("http://example.com/"), &format!("c{i}")),
                Some(i.to_string())
            );
        }
    }
}
