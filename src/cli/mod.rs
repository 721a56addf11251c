//! Command-line interface
//!
//! Argument parsing for the provisioner binary.

pub mod commands;

pub use commands::{Command, Opt};
