//! castplay - stream local or remote video files to a Cast receiver
//!
//! This library crate exposes the core functionality for integration testing.

pub mod cast;
pub mod config;
pub mod error;
pub mod playback;
pub mod server;
pub mod source;
pub mod streaming;

pub use error::{Error, Result};
