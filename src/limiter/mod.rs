//! Per-client rate limiting.
//!
//! # Data Flow
//! ```text
//! gate (client id, now)
//!     → tracker.rs (load record, compute transition, compare-and-swap)
//!     → store.rs (WindowStore: in-memory DashMap by default)
//!     ← Decision (Allowed / RateLimited / Blocked)
//!
//! collector.rs (timer)
//!     → tracker.evict_stale(now)
//!     → store.retain(!evictable)
//! ```
//!
//! # Design Decisions
//! - Fixed windows with a strike counter, not token buckets: clients that
//!   keep hitting the cap are escalated to a timed block
//! - Timestamps are epoch milliseconds from an injectable [`Clock`]
//! - State is process-local; the [`WindowStore`] trait is the seam for a
//!   shared store

pub mod clock;
pub mod collector;
pub mod store;
pub mod tracker;
pub mod window;

pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use collector::{Collector, CollectorHandle};
pub use store::{MemoryStore, WindowStore};
pub use tracker::RequestTracker;
pub use window::{ClientState, ClientWindow, Decision, LimitPolicy};
