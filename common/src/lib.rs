//! Durian Common Types
//!
//! Shared types used across the Durian settlement service: monetary amounts
//! with a fixed rounding policy, identifiers, the offramp request lifecycle,
//! and the clock abstraction used for cache expiry.

pub mod identifiers;
pub mod monetary;
pub mod offramp;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use monetary::*;
pub use offramp::*;
pub use error::*;
pub use time::*;
