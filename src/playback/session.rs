//! The remote playback capability the monitor drives.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// What to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub media_url: String,
    pub content_type: String,
    pub subtitles: Option<SubtitleTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub url: String,
    pub content_type: String,
}

/// One status report from the device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaStatus {
    /// Playback position in seconds, if reported.
    pub elapsed: Option<f64>,
    /// Media duration in seconds, if known.
    pub duration: Option<f64>,
    pub player_state: String,
    pub is_idle: bool,
}

impl MediaStatus {
    pub fn idle() -> Self {
        Self {
            player_state: "IDLE".to_string(),
            is_idle: true,
            ..Default::default()
        }
    }
}

/// A playback session on a remote device.
///
/// Retry and reconnect behaviour, if any, belongs to the implementation.
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Ask the device to load and play `request`.
    async fn start_session(&self, request: &MediaRequest) -> Result<()>;

    /// Wait until the device reports an active media session. Returns
    /// `false` if `timeout` elapsed first.
    async fn wait_until_active(&self, timeout: Duration) -> Result<bool>;

    /// Fetch the current playback status.
    async fn poll_status(&self) -> Result<MediaStatus>;

    /// Stop playback of the current media.
    async fn stop_session(&self) -> Result<()>;

    /// Close the receiver application.
    async fn tear_down(&self) -> Result<()>;

    /// Drop the connection to the device.
    async fn disconnect(&self, timeout: Duration) -> Result<()>;
}
