//! Durian Offramp Ledger
//!
//! Storage and lifecycle of offramp requests. Every status change is checked
//! against the transition table and written with a conditional update on the
//! status that was read, so terminal records cannot be reopened and two
//! admins acting at once cannot both win.

pub mod update;
pub mod repository;
pub mod postgres;
pub mod service;

pub use update::{NewOfframpRequest, OfframpUpdate};
pub use repository::{InMemoryOfframpRepository, OfframpRepository};
pub use postgres::PgOfframpRepository;
pub use service::{OfframpListing, OfframpService};
