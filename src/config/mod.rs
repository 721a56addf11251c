//! Configuration management
//!
//! Provisioning settings: node binary, directories, identifiers, port bases
//! and the timing of readiness polling and bootstrap discovery.

pub mod settings;

pub use settings::{Config, DEFAULT_GAS_LIMIT};
