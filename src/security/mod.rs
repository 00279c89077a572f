//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity.rs (derive client identifier)
//!     → bot.rs (classify user agent / headers)
//!     → gate (rate limit per identifier)
//! ```
//!
//! # Design Decisions
//! - Bot traffic is rejected before it can consume anyone's rate budget
//! - No trust in client-supplied forwarding headers unless configured

pub mod bot;
pub mod identity;

pub use bot::{BotDetector, BotReason, BotVerdict};
pub use identity::client_identifier;
