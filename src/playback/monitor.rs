//! Drives one playback session from start to stop.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::session::{MediaRequest, MediaSession};
use super::status::StatusLine;
use crate::config::PlaybackSettings;
use crate::error::{Error, Result};

/// Where the monitor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Session requested, waiting for the device to become active.
    Starting,
    Active,
    /// The device reports idle; not yet for long enough to stop.
    Idle,
    Stopped,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlaybackState::Starting => "starting",
            PlaybackState::Active => "active",
            PlaybackState::Idle => "idle",
            PlaybackState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Why the monitor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The device stayed idle longer than the idle timeout.
    Finished,
    /// Cancelled from outside, usually Ctrl+C.
    Interrupted,
}

/// Debounced idle detection.
///
/// A single idle sample never ends playback: idleness has to last strictly
/// longer than `timeout`, measured from the first idle sample of the current
/// run. Any non-idle sample resets the run.
#[derive(Debug, Clone)]
pub struct IdleTracker {
    timeout: Duration,
    idle_since: Option<Instant>,
}

impl IdleTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            idle_since: None,
        }
    }

    /// Record a sample taken at `now`. Returns `true` once the idle run has
    /// exceeded the timeout.
    pub fn observe(&mut self, is_idle: bool, now: Instant) -> bool {
        if !is_idle {
            self.idle_since = None;
            return false;
        }

        match self.idle_since {
            None => {
                self.idle_since = Some(now);
                false
            }
            Some(since) => now.duration_since(since) > self.timeout,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.idle_since.is_some()
    }
}

/// Foreground control loop for one playback.
pub struct PlaybackMonitor {
    session: Arc<dyn MediaSession>,
    settings: PlaybackSettings,
    cancel: CancellationToken,
    status_line: StatusLine,
    state: PlaybackState,
}

impl PlaybackMonitor {
    pub fn new(
        session: Arc<dyn MediaSession>,
        settings: PlaybackSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            settings,
            cancel,
            status_line: StatusLine::stdout(),
            state: PlaybackState::Starting,
        }
    }

    /// Render status somewhere other than stdout.
    pub fn with_status_line(mut self, status_line: StatusLine) -> Self {
        self.status_line = status_line;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Play `request` until the device goes idle for good or the token is
    /// cancelled.
    ///
    /// Stop, tear-down and disconnect are sent on every exit path, including
    /// errors. Cleanup failures are logged and never replace the outcome.
    pub async fn run(&mut self, request: &MediaRequest) -> Result<MonitorOutcome> {
        let outcome = self.drive(request).await;

        self.status_line.finish();
        self.transition(PlaybackState::Stopped);
        self.cleanup().await;

        outcome
    }

    async fn drive(&mut self, request: &MediaRequest) -> Result<MonitorOutcome> {
        self.transition(PlaybackState::Starting);

        let session = Arc::clone(&self.session);
        let Some(started) = self.until_cancelled(session.start_session(request)).await else {
            return Ok(MonitorOutcome::Interrupted);
        };
        started?;

        let wait_timeout = self.settings.wait_timeout;
        let Some(active) = self
            .until_cancelled(session.wait_until_active(wait_timeout))
            .await
        else {
            return Ok(MonitorOutcome::Interrupted);
        };
        if !active? {
            return Err(Error::ActivationTimeout {
                timeout: wait_timeout,
            });
        }

        self.transition(PlaybackState::Active);
        let mut idle = IdleTracker::new(self.settings.idle_timeout);

        loop {
            let Some(status) = self.until_cancelled(session.poll_status()).await else {
                return Ok(MonitorOutcome::Interrupted);
            };
            let status = status?;
            self.status_line.update(&status);

            if idle.observe(status.is_idle, Instant::now()) {
                tracing::debug!(
                    idle_timeout = ?self.settings.idle_timeout,
                    "Device idle past timeout, stopping"
                );
                return Ok(MonitorOutcome::Finished);
            }
            self.transition(if idle.is_idle() {
                PlaybackState::Idle
            } else {
                PlaybackState::Active
            });

            let poll_interval = self.settings.poll_interval;
            if self
                .until_cancelled(tokio::time::sleep(poll_interval))
                .await
                .is_none()
            {
                return Ok(MonitorOutcome::Interrupted);
            }
        }
    }

    /// Run `fut` unless cancellation comes first.
    async fn until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            output = fut => Some(output),
        }
    }

    async fn cleanup(&self) {
        if let Err(e) = self.session.stop_session().await {
            tracing::warn!("Failed to stop playback: {}", e);
        }
        if let Err(e) = self.session.tear_down().await {
            tracing::warn!("Failed to close receiver application: {}", e);
        }
        if let Err(e) = self.session.disconnect(self.settings.wait_timeout).await {
            tracing::warn!("Failed to disconnect from device: {}", e);
        }
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "Playback state changed");
            self.state = next;
        }
    }
}
