//! Utility functions and helpers
//!
//! Timestamps, JSON file helpers shared by the genesis writer and the
//! cluster registry, and the liveness heartbeat.

pub mod heartbeat;
pub mod serialization;
pub mod time;

pub use heartbeat::Heartbeat;
pub use serialization::{
    create_new_file, read_json, write_json_into, write_json_new, write_json_unique,
};
pub use time::{current_timestamp, unix_seconds};
