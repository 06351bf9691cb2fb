//! I/O edge of the metro status bot.
//!
//! Fetches and parses the operator's status page into a
//! [`Snapshot`](metro_core::models::Snapshot), and persists the last committed
//! snapshot between runs.

pub mod source;
pub mod store;
