//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup)
//!     → request.rs (assign x-request-id)
//!     → gate (protected routes only)
//!     → server.rs proxy handler → upstream
//!     → response (+ X-RateLimit-* when gated)
//! ```

pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError};
