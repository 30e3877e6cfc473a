//! Playback control.
//!
//! [`PlaybackMonitor`] runs in the foreground: it starts the media on the
//! device, polls status once per second, renders the status line and stops
//! the session when the device has been idle long enough or the user
//! interrupts.

mod monitor;
mod session;
mod status;

pub use monitor::{IdleTracker, MonitorOutcome, PlaybackMonitor, PlaybackState};
pub use session::{MediaRequest, MediaSession, MediaStatus, SubtitleTrack};
pub use status::{format_clock, render_status, StatusLine, UNKNOWN_TIME};
