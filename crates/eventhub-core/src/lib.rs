//! `EventHub` Core Library
//!
//! Shared functionality for `EventHub` components:
//! - Configuration resolution and hierarchy
//! - `SQLite` pool helpers and the `define_database!` macro
//! - Tracing initialisation and optional OTLP metrics
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
