//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, framing, isolation)
//! 5. Session layer (tower-sessions, in-memory store)
//! 6. Rate limiting (governor) on the sign-in routes

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAuth, begin_session, current_generation, end_session, is_current,
};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::{SecurityHeaders, security_headers_middleware};
pub use session::create_session_layer;
