//! Route applicability for the gate.
//!
//! # Data Flow
//! ```text
//! request path
//!     → router.rs (ProtectedRoutes: any matcher hits?)
//!     → matcher.rs (prefix / exact / contains)
//!     → protected → gate, otherwise straight to the upstream
//! ```

pub mod matcher;
pub mod router;

pub use matcher::Matcher;
pub use router::ProtectedRoutes;
