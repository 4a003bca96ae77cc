//! Common utility helpers
//!
//! - **[`serde`]**: Serialization helpers for durations in config files

pub mod serde;

pub use self::serde::duration_micros;
