//! Rate limiting and bot gate for web application routes.
//!
//! ```text
//!     Client ──▶ request id ──▶ trace ──▶ gate ──▶ proxy ──▶ upstream app
//!                                          │
//!                               routes → bots → tracker
//!                                                  ▲
//!                                      collector ──┘ (periodic eviction)
//! ```

pub mod admin;
pub mod config;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod limiter;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::AppConfig;
pub use gate::{Gate, GateOutcome};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use limiter::{Decision, RequestTracker};
