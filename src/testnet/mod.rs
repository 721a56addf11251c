//! Scripted stand-ins for the node binary and the administrative RPC
//!
//! Used by unit tests to drive the lifecycle and convergence logic without
//! real node processes.

pub mod fakes;

pub use fakes::*;
