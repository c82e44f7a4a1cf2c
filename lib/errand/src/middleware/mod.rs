//! Tower middleware layers used by the errand transport stack.
//!
//! Every layer works on [`PreparedRequest`](crate::PreparedRequest) and
//! [`RawResponse`](crate::RawResponse). A [`Client`](crate::Client) composes
//! them per request, outermost first:
//!
//! - [`LoggingLayer`] - Logs requests/responses using `tracing`
//! - [`FollowRedirectLayer`] - Follows 3xx responses, only when the request
//!   allows redirects
//! - [`CookieLayer`] - Sends and stores cookies from a shared
//!   [`CookieJar`](crate::CookieJar), on every redirect hop
//!
//! # Example: composing layers by hand
//!
//! ```ignore
//! use errand::middleware::{FollowRedirectLayer, LoggingLayer};
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(LoggingLayer::new())
//!     .layer(FollowRedirectLayer::with_max_redirects(5))
//!     .service(raw_client);
//! ```

mod cookies;
mod follow_redirect;
mod logging;

pub use cookies::{CookieLayer, Cookies};
pub use follow_redirect::{DEFAULT_MAX_REDIRECTS, FollowRedirect, FollowRedirectLayer};
pub use logging::{LogLevel, Logging, LoggingLayer};

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};
