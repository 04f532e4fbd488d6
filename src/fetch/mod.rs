//! Fetch Module
//!
//! Cached access to the upstream API: the transport abstraction, the
//! reqwest-backed HTTP transport, the cached fetch orchestrator and the
//! session-scoped cache that ties them together.

mod http;
mod orchestrator;
mod session;
mod transport;

pub use http::{HttpTransport, StaticToken, TokenSource, CSRF_HEADER, REQUESTED_WITH_HEADER};
pub use orchestrator::{CacheConfig, CachedFetcher, FetchOutcome, SharedStore};
pub use session::ApiCache;
pub use transport::{ApiRequest, Method, Transport};
