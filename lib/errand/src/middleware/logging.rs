//! Request/response logging middleware.
//!
//! This middleware logs HTTP requests and responses using the `tracing` crate.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{Instrument, Level, debug, info, span, warn};

use crate::{Error, PreparedRequest, RawResponse, Result};

/// Layer that adds request/response logging.
///
/// # Example
///
/// ```ignore
/// use errand::middleware::LoggingLayer;
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(LoggingLayer::new())
///     .service(client);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    level: LogLevel,
}

/// Log level for the logging middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (request/response details).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

impl LoggingLayer {
    /// Create a new logging layer with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging layer that logs at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self::with_level(LogLevel::Debug)
    }

    /// Create a logging layer with the given level.
    #[must_use]
    pub const fn with_level(level: LogLevel) -> Self {
        Self { level }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            level: self.level,
        }
    }
}

/// Service that logs requests and responses.
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    level: LogLevel,
}

impl<S> Service<PreparedRequest> for Logging<S>
where
    S: Service<PreparedRequest, Response = RawResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = RawResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: PreparedRequest) -> Self::Future {
        let method = request.method().clone();
        let url = request.url().to_string();
        let level = self.level;

        let span = span!(Level::INFO, "http_request", %method, %url);

        let mut inner = self.inner.clone();
        Box::pin(
            async move {
                let start = Instant::now();

                match level {
                    LogLevel::Debug => {
                        debug!(
                            headers = ?request.headers(),
                            body_len = request.body().len(),
                            "sending request"
                        );
                    }
                    LogLevel::Info => {
                        info!("sending request");
                    }
                }

                let result = inner.call(request).await;

                // Saturating conversion to u64 (truncates after ~584 million years)
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        if response.status().is_client_error() || response.status().is_server_error()
                        {
                            warn!(status, elapsed_ms, "request failed with HTTP error");
                        } else {
                            info!(status, elapsed_ms, "request completed");
                        }
                        if level == LogLevel::Debug {
                            debug!(
                                headers = ?response.headers(),
                                body_len = response.body().len(),
                                "response received"
                            );
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};
    use tower::ServiceExt;
    use tower::service_fn;
    use url::Url;

    use super::*;

    #[test]
    fn logging_layer_default() {
        let layer = LoggingLayer::new();
        assert_eq!(layer.level, LogLevel::Info);
    }

    #[test]
    fn logging_layer_debug() {
        let layer = LoggingLayer::debug();
        assert_eq!(layer.level, LogLevel::Debug);
    }

    #[tokio::test]
    async fn logging_is_transparent() {
        let inner = service_fn(|request: PreparedRequest| async move {
            Ok::<_, Error>(RawResponse::new(
                StatusCode::NOT_FOUND,
                request.url().clone(),
                HeaderMap::new(),
                Bytes::from_static(b"missing"),
            ))
        });
        let service = LoggingLayer::debug().layer(inner);

        let request = PreparedRequest::new(
            Method::GET,
            Url::parse("http://example.com/missing").expect("url"),
            HeaderMap::new(),
            Bytes::new(),
        );
        let response = service.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body().as_ref(), b"missing");
    }
}
