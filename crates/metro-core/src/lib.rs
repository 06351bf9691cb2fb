//! Core types and pure logic for the metro status bot.
//!
//! Holds the line/status data model, snapshot diffing, notification
//! formatting and chunking, settings and the shared error type. Nothing in
//! this crate performs network or file I/O.

pub mod chunking;
pub mod detector;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{MetroError, Result};
