//! CareCircle notification domain logic.
//!
//! Everything in this crate is pure: no I/O, no async. The engine in
//! `carecircle-events` and the HTTP layer in `carecircle-api` build on these
//! types so that delivery rules can be tested without a database.

pub mod channels;
pub mod error;
pub mod notification;
pub mod preferences;
pub mod quiet_hours;
pub mod source;
pub mod types;
