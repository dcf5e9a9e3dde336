//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request context (request ID plus restaurant or order ID from the path)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)

pub mod request_context;
pub mod session;

pub use request_context::request_context_middleware;
pub use session::create_session_layer;
