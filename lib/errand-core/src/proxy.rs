//! Per-request proxy map and proxy selection.

use std::collections::BTreeMap;

use crate::{Error, Result};

/// Key of the entry that overrides scheme-based selection.
pub const SOCKS5: &str = "socks5";

/// Proxy map: URL scheme (`http`, `https`) to proxy URL, with an optional
/// `socks5` entry used for every scheme.
///
/// The proxy URLs are not parsed here; a malformed URL only fails when a
/// connection is dialed through it.
///
/// # Example
///
/// ```
/// use errand_core::Proxy;
///
/// let proxy = Proxy::new().http("http://127.0.0.1:3128");
/// assert_eq!(proxy.select("http"), Some("http://127.0.0.1:3128"));
/// assert_eq!(proxy.select("https"), None);
///
/// let proxy = proxy.socks5("socks5://127.0.0.1:1080");
/// assert_eq!(proxy.select("https"), Some("socks5://127.0.0.1:1080"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Proxy {
    entries: BTreeMap<String, String>,
}

impl Proxy {
    /// Creates an empty proxy map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the proxy used for `http://` requests.
    #[must_use]
    pub fn http(self, url: impl Into<String>) -> Self {
        self.with("http", url)
    }

    /// Sets the proxy used for `https://` requests.
    #[must_use]
    pub fn https(self, url: impl Into<String>) -> Self {
        self.with("https", url)
    }

    /// Sets a SOCKS5 proxy used for every request.
    #[must_use]
    pub fn socks5(self, url: impl Into<String>) -> Self {
        self.with(SOCKS5, url)
    }

    /// Sets the proxy for an arbitrary key.
    #[must_use]
    pub fn with(mut self, scheme: impl Into<String>, url: impl Into<String>) -> Self {
        self.entries.insert(scheme.into(), url.into());
        self
    }

    /// Raw entry for a key, possibly empty.
    #[must_use]
    pub fn get(&self, scheme: &str) -> Option<&str> {
        self.entries.get(scheme).map(String::as_str)
    }

    /// Non-empty entry for a key.
    fn non_empty(&self, scheme: &str) -> Option<&str> {
        self.get(scheme).filter(|url| !url.is_empty())
    }

    /// Checks that at least one of `http`, `https` or `socks5` is usable.
    pub fn validate(&self) -> Result<()> {
        if ["http", "https", SOCKS5]
            .iter()
            .any(|scheme| self.non_empty(scheme).is_some())
        {
            Ok(())
        } else {
            Err(Error::invalid_option("proxy can not be empty"))
        }
    }

    /// Proxy URL to use for a request with the given URL scheme.
    ///
    /// A non-empty `socks5` entry wins for every scheme; otherwise the entry
    /// keyed by the scheme is used. `None` means a direct connection.
    #[must_use]
    pub fn select(&self, scheme: &str) -> Option<&str> {
        let selected = self.non_empty(SOCKS5).or_else(|| self.non_empty(scheme));
        tracing::trace!(scheme, proxy = ?selected, "proxy selected");
        selected
    }
}

impl<K, V> FromIterator<(K, V)> for Proxy
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_entries_are_rejected() {
        let proxy: Proxy = [("http", ""), ("https", "")].into_iter().collect();
        let err = proxy.validate().expect_err("empty proxy");
        assert_eq!(err.to_string(), "invalid option: proxy can not be empty");

        assert!(Proxy::new().validate().is_err());
        assert!(Proxy::new().with("ftp", "http://p:1").validate().is_err());
    }

    #[test]
    fn any_usable_entry_is_accepted() {
        assert!(Proxy::new().http("http://p:3128").validate().is_ok());
        assert!(Proxy::new().https("http://p:3128").validate().is_ok());
        assert!(Proxy::new().socks5("socks5://h:1080").validate().is_ok());
    }

    #[test]
    fn select_by_scheme() {
        let proxy = Proxy::new()
            .http("http://plain:3128")
            .https("http://secure:3128");
        assert_eq!(proxy.select("http"), Some("http://plain:3128"));
        assert_eq!(proxy.select("https"), Some("http://secure:3128"));
    }

    #[test]
    fn socks5_wins_regardless_of_scheme() {
        let proxy: Proxy = [("socks5", "socks5://h:1080")].into_iter().collect();
        assert_eq!(proxy.select("http"), Some("socks5://h:1080"));
        assert_eq!(proxy.select("https"), Some("socks5://h:1080"));

        let proxy = proxy.http("http://plain:3128");
        assert_eq!(proxy.select("http"), Some("socks5://h:1080"));
    }

    #[test]
    fn empty_socks5_falls_back_to_scheme() {
        let proxy = Proxy::new().socks5("").http("http://plain:3128");
        assert_eq!(proxy.select("http"), Some("http://plain:3128"));
        assert_eq!(proxy.select("https"), None);
    }
}
