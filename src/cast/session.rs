//! [`MediaSession`] over the Cast v2 control channel.

use std::net::{IpAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use native_tls::TlsStream;
use parking_lot::Mutex;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::channel::{CastChannel, CastStream};
use super::protocol::{
    Application, Incoming, LoadCommand, MediaStatusEntry, DEFAULT_MEDIA_RECEIVER_APP_ID,
    NAMESPACE_MEDIA, NAMESPACE_RECEIVER, PLAYER_STATE_IDLE, RECEIVER_ID,
};
use super::CastTarget;
use crate::error::{Error, Result};
use crate::playback::{MediaRequest, MediaSession, MediaStatus};

/// How long to wait for the reply to a status request.
const STATUS_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Mutable state behind the session lock.
struct CastState<S> {
    channel: CastChannel<S>,
    /// Ends waits on the device early; cleanup requests ignore it.
    cancel: CancellationToken,
    app: Option<Application>,
    media_session_id: Option<i64>,
    last_status: MediaStatus,
}

/// A Cast device running the default media receiver.
///
/// The channel is a blocking socket, so every operation runs on the blocking
/// thread pool while holding the session lock.
pub struct CastSession<S = TlsStream<TcpStream>> {
    state: Arc<Mutex<CastState<S>>>,
    target: CastTarget,
    local_ip: IpAddr,
    launch_timeout: Duration,
}

impl CastSession {
    /// Connect to `target`. `timeout` bounds the TCP connect, the TLS
    /// handshake and later the receiver application launch.
    pub async fn connect(target: CastTarget, timeout: Duration) -> Result<Self> {
        let connect_target = target.clone();
        let channel =
            tokio::task::spawn_blocking(move || CastChannel::connect(&connect_target, timeout))
                .await
                .map_err(|e| Error::cast(format!("connect task failed: {}", e)))??;

        tracing::info!(device = %target, "Connected to cast device");

        Ok(Self::with_channel(channel, target, timeout))
    }
}

impl<S: CastStream> CastSession<S> {
    /// Drive a session over an already connected channel.
    pub fn with_channel(channel: CastChannel<S>, target: CastTarget, launch_timeout: Duration) -> Self {
        let local_ip = channel.local_ip();
        Self {
            state: Arc::new(Mutex::new(CastState::new(channel))),
            target,
            local_ip,
            launch_timeout,
        }
    }

    /// Abandon launch, activation and status waits once `cancel` fires, so
    /// that the lock is free for cleanup.
    pub fn with_cancellation(self, cancel: CancellationToken) -> Self {
        self.state.lock().cancel = cancel;
        self
    }

    /// Our address as seen by the device.
    pub fn local_ip(&self) -> IpAddr {
        self.local_ip
    }

    pub fn target(&self) -> &CastTarget {
        &self.target
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut CastState<S>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || op(&mut state.lock()))
            .await
            .map_err(|e| Error::cast(format!("cast worker failed: {}", e)))?
    }
}

impl<S: CastStream> CastState<S> {
    fn new(channel: CastChannel<S>) -> Self {
        Self {
            channel,
            cancel: CancellationToken::new(),
            app: None,
            media_session_id: None,
            last_status: MediaStatus::default(),
        }
    }

    /// Launch the default media receiver (or join it if it is already
    /// running) and connect to its transport.
    fn launch(&mut self, timeout: Duration) -> Result<Application> {
        self.channel.open_virtual(RECEIVER_ID)?;
        self.channel.request(
            NAMESPACE_RECEIVER,
            RECEIVER_ID,
            "LAUNCH",
            json!({"appId": DEFAULT_MEDIA_RECEIVER_APP_ID}),
        )?;

        let deadline = Instant::now() + timeout;
        let app = self
            .channel
            .recv_until(deadline, &self.cancel, |message| match message.parse()? {
                Incoming::ReceiverStatus(status) => {
                    Ok(status.application(DEFAULT_MEDIA_RECEIVER_APP_ID).cloned())
                }
                Incoming::Failure { kind, reason } => Err(Error::cast(format!(
                    "receiver launch failed: {}{}",
                    kind,
                    reason.map(|r| format!(" ({})", r)).unwrap_or_default()
                ))),
                _ => Ok(None),
            })?
            .ok_or_else(|| Error::cast("timed out launching the media receiver"))?;

        self.channel.open_virtual(&app.transport_id)?;
        tracing::debug!(
            session_id = %app.session_id,
            transport_id = %app.transport_id,
            "Media receiver running"
        );
        self.app = Some(app.clone());
        Ok(app)
    }

    /// Launch the receiver and ask it to load `request`.
    fn load(&mut self, request: &MediaRequest, launch_timeout: Duration) -> Result<()> {
        let app = self.launch(launch_timeout)?;
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let load = LoadCommand::new(
            app.session_id,
            &request.media_url,
            &request.content_type,
            request
                .subtitles
                .as_ref()
                .map(|s| (s.url.as_str(), s.content_type.as_str())),
        );
        self.channel.request(
            NAMESPACE_MEDIA,
            &app.transport_id,
            "LOAD",
            serde_json::to_value(&load)?,
        )?;
        tracing::debug!(url = %request.media_url, "Load requested");
        Ok(())
    }

    fn transport_id(&self) -> Result<String> {
        self.app
            .as_ref()
            .map(|app| app.transport_id.clone())
            .ok_or_else(|| Error::cast("media receiver is not running"))
    }

    /// Read messages until a media status arrives; remembers it.
    fn await_media_status(&mut self, deadline: Instant) -> Result<Option<MediaStatus>> {
        let entries = self
            .channel
            .recv_until(deadline, &self.cancel, |message| {
                if message.namespace != NAMESPACE_MEDIA {
                    return Ok(None);
                }
                match message.parse()? {
                    Incoming::MediaStatus(entries) => Ok(Some(entries)),
                    Incoming::Failure { kind, reason } => Err(Error::cast(format!(
                        "device rejected media: {}{}",
                        kind,
                        reason.map(|r| format!(" ({})", r)).unwrap_or_default()
                    ))),
                    _ => Ok(None),
                }
            })?;

        Ok(entries.map(|entries| {
            let status = match entries.first() {
                Some(entry) => {
                    self.media_session_id = Some(entry.media_session_id);
                    media_status_from(entry)
                }
                None => MediaStatus::idle(),
            };
            self.last_status = status.clone();
            status
        }))
    }

    /// Whether a media session shows up before `timeout`.
    fn wait_active(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        while self.await_media_status(deadline)?.is_some() {
            if self.media_session_id.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Request a status and wait up to `reply_timeout` for it. Without a
    /// reply the last known status stands.
    fn poll(&mut self, reply_timeout: Duration) -> Result<MediaStatus> {
        let transport_id = self.transport_id()?;
        self.channel
            .request(NAMESPACE_MEDIA, &transport_id, "GET_STATUS", json!({}))?;

        match self.await_media_status(Instant::now() + reply_timeout)? {
            Some(status) => Ok(status),
            None => {
                tracing::debug!("No status reply, reusing last known status");
                Ok(self.last_status.clone())
            }
        }
    }

    fn stop_media(&mut self) -> Result<()> {
        let (Some(media_session_id), Ok(transport_id)) = (self.media_session_id, self.transport_id())
        else {
            return Ok(());
        };
        self.channel.request(
            NAMESPACE_MEDIA,
            &transport_id,
            "STOP",
            json!({"mediaSessionId": media_session_id}),
        )?;
        self.media_session_id = None;
        Ok(())
    }

    fn stop_app(&mut self) -> Result<()> {
        let Some(app) = self.app.take() else {
            return Ok(());
        };
        self.channel.close_virtual(&app.transport_id)?;
        self.channel.request(
            NAMESPACE_RECEIVER,
            RECEIVER_ID,
            "STOP",
            json!({"sessionId": app.session_id}),
        )?;
        Ok(())
    }

    fn close(&mut self, timeout: Duration) -> Result<()> {
        let closed = self.channel.close_virtual(RECEIVER_ID);
        self.channel.shutdown(timeout);
        closed
    }
}

/// Convert the device's report into the monitor's view.
fn media_status_from(entry: &MediaStatusEntry) -> MediaStatus {
    MediaStatus {
        elapsed: entry.current_time,
        duration: entry.media.as_ref().and_then(|m| m.duration),
        player_state: entry.player_state.clone(),
        is_idle: entry.player_state == PLAYER_STATE_IDLE,
    }
}

#[async_trait]
impl<S: CastStream> MediaSession for CastSession<S> {
    async fn start_session(&self, request: &MediaRequest) -> Result<()> {
        let request = request.clone();
        let timeout = self.launch_timeout;
        self.blocking(move |state| state.load(&request, timeout))
            .await
    }

    async fn wait_until_active(&self, timeout: Duration) -> Result<bool> {
        self.blocking(move |state| state.wait_active(timeout)).await
    }

    async fn poll_status(&self) -> Result<MediaStatus> {
        self.blocking(|state| state.poll(STATUS_REPLY_TIMEOUT)).await
    }

    async fn stop_session(&self) -> Result<()> {
        self.blocking(|state| state.stop_media()).await
    }

    async fn tear_down(&self) -> Result<()> {
        self.blocking(|state| state.stop_app()).await
    }

    async fn disconnect(&self, timeout: Duration) -> Result<()> {
        self.blocking(move |state| state.close(timeout)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::protocol::{MediaStatusInfo, NAMESPACE_HEARTBEAT};
    use crate::cast::test_fixtures::{scripted_channel, ScriptedStream};
    use crate::config::PlaybackSettings;
    use crate::playback::{MonitorOutcome, PlaybackMonitor, StatusLine};
    use assert_matches::assert_matches;
    use serde_json::Value;

    const TRANSPORT_ID: &str = "transport-1";

    fn request() -> MediaRequest {
        MediaRequest {
            media_url: "http://192.168.1.2:8080/video".to_string(),
            content_type: "video/mp4".to_string(),
            subtitles: None,
        }
    }

    fn receiver_status() -> Value {
        json!({
            "type": "RECEIVER_STATUS",
            "requestId": 1,
            "status": {
                "applications": [{
                    "appId": DEFAULT_MEDIA_RECEIVER_APP_ID,
                    "sessionId": "session-1",
                    "transportId": TRANSPORT_ID
                }]
            }
        })
    }

    fn media_status(entries: Value) -> Value {
        json!({"type": "MEDIA_STATUS", "status": entries})
    }

    fn playing(media_session_id: i64, current_time: f64) -> Value {
        media_status(json!([{
            "mediaSessionId": media_session_id,
            "playerState": "PLAYING",
            "currentTime": current_time,
            "media": {"duration": 600.0}
        }]))
    }

    /// State with the receiver app already running.
    fn running_state(stream: &ScriptedStream) -> CastState<ScriptedStream> {
        let mut state = CastState::new(scripted_channel(stream));
        state.app = Some(Application {
            app_id: DEFAULT_MEDIA_RECEIVER_APP_ID.to_string(),
            session_id: "session-1".to_string(),
            transport_id: TRANSPORT_ID.to_string(),
        });
        state
    }

    #[test]
    fn test_media_status_from_playing() {
        let entry = MediaStatusEntry {
            media_session_id: 1,
            player_state: "PLAYING".to_string(),
            current_time: Some(61.7),
            media: Some(MediaStatusInfo {
                duration: Some(120.0),
            }),
            idle_reason: None,
        };
        let status = media_status_from(&entry);
        assert_eq!(status.elapsed, Some(61.7));
        assert_eq!(status.duration, Some(120.0));
        assert_eq!(status.player_state, "PLAYING");
        assert!(!status.is_idle);
    }

    #[test]
    fn test_media_status_from_idle() {
        let entry = MediaStatusEntry {
            media_session_id: 1,
            player_state: "IDLE".to_string(),
            current_time: None,
            media: None,
            idle_reason: Some("FINISHED".to_string()),
        };
        let status = media_status_from(&entry);
        assert!(status.is_idle);
        assert_eq!(status.duration, None);
    }

    #[test]
    fn test_load_launches_then_loads_on_transport() {
        let stream = ScriptedStream::new();
        stream.push(RECEIVER_ID, NAMESPACE_RECEIVER, receiver_status());
        let mut state = CastState::new(scripted_channel(&stream));

        state.load(&request(), Duration::from_secs(1)).unwrap();

        assert_eq!(stream.sent_types(), ["CONNECT", "LAUNCH", "CONNECT", "LOAD"]);
        let sent = stream.sent();
        assert_eq!(sent[2].destination_id, TRANSPORT_ID);
        assert_eq!(sent[3].destination_id, TRANSPORT_ID);
        assert_eq!(sent[3].namespace, NAMESPACE_MEDIA);
        assert_eq!(state.transport_id().unwrap(), TRANSPORT_ID);
    }

    #[test]
    fn test_cancelled_launch_never_loads() {
        let stream = ScriptedStream::new();
        let mut state = CastState::new(scripted_channel(&stream));
        let cancel = state.cancel.clone();

        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            cancel.cancel();
        });

        let started = Instant::now();
        let result = state.load(&request(), Duration::from_secs(5));
        canceller.join().unwrap();

        assert_matches!(result, Err(Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(stream.sent_types(), ["CONNECT", "LAUNCH"]);
        assert!(state.app.is_none());
    }

    #[test]
    fn test_wait_active_needs_media_session_id() {
        let stream = ScriptedStream::new();
        stream.push(TRANSPORT_ID, NAMESPACE_MEDIA, media_status(json!([])));
        stream.push(TRANSPORT_ID, NAMESPACE_MEDIA, playing(7, 0.0));
        let mut state = running_state(&stream);

        assert!(state.wait_active(Duration::from_secs(1)).unwrap());
        assert_eq!(state.media_session_id, Some(7));
    }

    #[test]
    fn test_wait_active_times_out_without_media_session() {
        let stream = ScriptedStream::new();
        stream.push(TRANSPORT_ID, NAMESPACE_MEDIA, media_status(json!([])));
        let mut state = running_state(&stream);

        assert!(!state.wait_active(Duration::from_millis(100)).unwrap());
        assert_eq!(state.media_session_id, None);
    }

    #[test]
    fn test_empty_media_status_is_idle() {
        let stream = ScriptedStream::new();
        stream.push(TRANSPORT_ID, NAMESPACE_MEDIA, media_status(json!([])));
        let mut state = running_state(&stream);

        let status = state.poll(Duration::from_secs(1)).unwrap();
        assert_eq!(status, MediaStatus::idle());
        assert_eq!(stream.sent_types(), ["GET_STATUS"]);
    }

    #[test]
    fn test_poll_without_reply_reuses_last_status() {
        let stream = ScriptedStream::new();
        stream.push(TRANSPORT_ID, NAMESPACE_MEDIA, playing(3, 42.0));
        let mut state = running_state(&stream);

        let first = state.poll(Duration::from_secs(1)).unwrap();
        assert_eq!(first.elapsed, Some(42.0));
        assert_eq!(first.player_state, "PLAYING");

        let second = state.poll(Duration::from_millis(50)).unwrap();
        assert_eq!(second, first);
        assert_eq!(stream.sent_types(), ["GET_STATUS", "GET_STATUS"]);
    }

    #[test]
    fn test_poll_answers_heartbeat_while_waiting() {
        let stream = ScriptedStream::new();
        stream.push(RECEIVER_ID, NAMESPACE_HEARTBEAT, json!({"type": "PING"}));
        stream.push(TRANSPORT_ID, NAMESPACE_MEDIA, playing(3, 1.0));
        let mut state = running_state(&stream);

        assert!(!state.poll(Duration::from_secs(1)).unwrap().is_idle);
        assert_eq!(stream.sent_types(), ["GET_STATUS", "PONG"]);
    }

    #[test]
    fn test_stop_and_close_sequence() {
        let stream = ScriptedStream::new();
        let mut state = running_state(&stream);
        state.media_session_id = Some(3);

        state.stop_media().unwrap();
        state.stop_app().unwrap();
        state.close(Duration::from_secs(1)).unwrap();

        assert_eq!(stream.sent_types(), ["STOP", "CLOSE", "STOP", "CLOSE"]);
        let sent = stream.sent();
        assert_eq!(sent[0].namespace, NAMESPACE_MEDIA);
        assert_eq!(sent[2].namespace, NAMESPACE_RECEIVER);
        assert_eq!(sent[3].destination_id, RECEIVER_ID);
        assert!(stream.is_closed());

        // Nothing left to stop the second time round.
        state.stop_media().unwrap();
        state.stop_app().unwrap();
        assert_eq!(stream.sent().len(), 4);
    }

    #[tokio::test]
    async fn test_interrupt_during_launch_reaches_cleanup_promptly() {
        let stream = ScriptedStream::new();
        let cancel = CancellationToken::new();
        let target: CastTarget = "192.168.1.50".parse().unwrap();
        let session = CastSession::with_channel(
            scripted_channel(&stream),
            target,
            Duration::from_secs(5),
        )
        .with_cancellation(cancel.clone());

        let settings = PlaybackSettings {
            wait_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let mut monitor = PlaybackMonitor::new(Arc::new(session), settings, cancel.clone())
            .with_status_line(StatusLine::new(Box::new(std::io::sink())));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        });

        let started = Instant::now();
        let outcome = monitor.run(&request()).await.unwrap();

        assert_eq!(outcome, MonitorOutcome::Interrupted);
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "cleanup waited {:?}",
            started.elapsed()
        );
        assert!(!stream.sent_types().contains(&"LOAD".to_string()));
        assert_eq!(stream.sent().last().unwrap().destination_id, RECEIVER_ID);
        assert!(stream.is_closed());
    }
}
