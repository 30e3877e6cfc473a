//! JSON payloads exchanged on the Cast v2 namespaces.

use serde::{Deserialize, Serialize};

pub const NAMESPACE_CONNECTION: &str = "urn:x-cast:com.google.cast.tp.connection";
pub const NAMESPACE_HEARTBEAT: &str = "urn:x-cast:com.google.cast.tp.heartbeat";
pub const NAMESPACE_RECEIVER: &str = "urn:x-cast:com.google.cast.receiver";
pub const NAMESPACE_MEDIA: &str = "urn:x-cast:com.google.cast.media";

/// Platform receiver, always present on the device.
pub const RECEIVER_ID: &str = "receiver-0";

/// Google's stock media receiver application.
pub const DEFAULT_MEDIA_RECEIVER_APP_ID: &str = "CC1AD845";

pub const PLAYER_STATE_IDLE: &str = "IDLE";

/// Track id used for the single side-loaded subtitle track.
const SUBTITLE_TRACK_ID: u32 = 1;

/// `LOAD` body for the media namespace. `type` and `requestId` are added by
/// the channel when sending.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadCommand {
    pub session_id: String,
    pub media: MediaInformation,
    pub autoplay: bool,
    pub current_time: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub active_track_ids: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInformation {
    pub content_id: String,
    pub content_type: String,
    pub stream_type: &'static str,
    pub metadata: GenericMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tracks: Vec<MediaTrack>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericMetadata {
    pub metadata_type: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTrack {
    pub track_id: u32,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub subtype: &'static str,
    pub track_content_id: String,
    pub track_content_type: String,
    pub name: &'static str,
    pub language: &'static str,
}

impl LoadCommand {
    /// Build a buffered-stream load with autoplay, optionally with one
    /// subtitle track enabled.
    pub fn new(
        session_id: impl Into<String>,
        media_url: &str,
        content_type: &str,
        subtitles: Option<(&str, &str)>,
    ) -> Self {
        let tracks: Vec<MediaTrack> = subtitles
            .map(|(url, content_type)| MediaTrack {
                track_id: SUBTITLE_TRACK_ID,
                kind: "TEXT",
                subtype: "SUBTITLES",
                track_content_id: url.to_string(),
                track_content_type: content_type.to_string(),
                name: "Subtitles",
                language: "en-US",
            })
            .into_iter()
            .collect();
        let active_track_ids = tracks.iter().map(|t| t.track_id).collect();

        Self {
            session_id: session_id.into(),
            media: MediaInformation {
                content_id: media_url.to_string(),
                content_type: content_type.to_string(),
                stream_type: "BUFFERED",
                metadata: GenericMetadata { metadata_type: 0 },
                tracks,
            },
            autoplay: true,
            current_time: 0.0,
            active_track_ids,
        }
    }
}

/// Just enough of any payload to route it.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct ReceiverStatusMessage {
    pub status: ReceiverStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReceiverStatus {
    #[serde(default)]
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub app_id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub transport_id: String,
}

impl ReceiverStatus {
    /// The running instance of `app_id`, if the receiver reports one with a
    /// usable transport.
    pub fn application(&self, app_id: &str) -> Option<&Application> {
        self.applications
            .iter()
            .find(|app| app.app_id == app_id && !app.transport_id.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct MediaStatusMessage {
    #[serde(default)]
    pub status: Vec<MediaStatusEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatusEntry {
    pub media_session_id: i64,
    #[serde(default)]
    pub player_state: String,
    #[serde(default)]
    pub current_time: Option<f64>,
    #[serde(default)]
    pub media: Option<MediaStatusInfo>,
    #[serde(default)]
    pub idle_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaStatusInfo {
    #[serde(default)]
    pub duration: Option<f64>,
}

/// A decoded payload from the receiver or media namespace.
#[derive(Debug)]
pub enum Incoming {
    ReceiverStatus(ReceiverStatus),
    MediaStatus(Vec<MediaStatusEntry>),
    /// `LOAD_FAILED`, `LOAD_CANCELLED`, `INVALID_REQUEST` and `LAUNCH_ERROR`.
    Failure { kind: String, reason: Option<String> },
    Other { kind: String },
}

impl Incoming {
    /// Decode a payload received on `namespace`.
    pub fn parse(namespace: &str, payload: &str) -> serde_json::Result<Self> {
        let envelope: Envelope = serde_json::from_str(payload)?;

        Ok(match (namespace, envelope.kind.as_str()) {
            (NAMESPACE_RECEIVER, "RECEIVER_STATUS") => {
                let message: ReceiverStatusMessage = serde_json::from_str(payload)?;
                Incoming::ReceiverStatus(message.status)
            }
            (NAMESPACE_MEDIA, "MEDIA_STATUS") => {
                let message: MediaStatusMessage = serde_json::from_str(payload)?;
                Incoming::MediaStatus(message.status)
            }
            (_, "LOAD_FAILED" | "LOAD_CANCELLED" | "INVALID_REQUEST" | "LAUNCH_ERROR") => {
                let reason = serde_json::from_str::<serde_json::Value>(payload)?
                    .get("reason")
                    .and_then(|r| r.as_str())
                    .map(ToString::to_string);
                Incoming::Failure {
                    kind: envelope.kind,
                    reason,
                }
            }
            _ => Incoming::Other {
                kind: envelope.kind,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_load_command_without_subtitles() {
        let load = LoadCommand::new("s1", "http://10.0.0.2:8080/video", "video/mp4", None);
        let value = serde_json::to_value(&load).unwrap();

        assert_eq!(value["sessionId"], "s1");
        assert_eq!(value["autoplay"], true);
        assert_eq!(value["media"]["contentId"], "http://10.0.0.2:8080/video");
        assert_eq!(value["media"]["streamType"], "BUFFERED");
        assert!(value["media"].get("tracks").is_none());
        assert!(value.get("activeTrackIds").is_none());
    }

    #[test]
    fn test_load_command_with_subtitles() {
        let load = LoadCommand::new(
            "s1",
            "http://10.0.0.2:8080/video",
            "video/mp4",
            Some(("http://10.0.0.2:8080/subtitles", "text/vtt")),
        );
        let value = serde_json::to_value(&load).unwrap();

        assert_eq!(value["activeTrackIds"], json!([1]));
        let track = &value["media"]["tracks"][0];
        assert_eq!(track["trackId"], 1);
        assert_eq!(track["type"], "TEXT");
        assert_eq!(track["subtype"], "SUBTITLES");
        assert_eq!(track["trackContentId"], "http://10.0.0.2:8080/subtitles");
        assert_eq!(track["trackContentType"], "text/vtt");
    }

    #[test]
    fn test_parse_receiver_status() {
        let payload = json!({
            "type": "RECEIVER_STATUS",
            "requestId": 2,
            "status": {
                "applications": [
                    {"appId": "E8C28D3C", "displayName": "Backdrop"},
                    {
                        "appId": "CC1AD845",
                        "sessionId": "abc",
                        "transportId": "web-5",
                        "displayName": "Default Media Receiver"
                    }
                ],
                "volume": {"level": 1.0}
            }
        })
        .to_string();

        let incoming = Incoming::parse(NAMESPACE_RECEIVER, &payload).unwrap();
        let status = assert_matches!(incoming, Incoming::ReceiverStatus(s) => s);
        let app = status.application(DEFAULT_MEDIA_RECEIVER_APP_ID).unwrap();
        assert_eq!(app.session_id, "abc");
        assert_eq!(app.transport_id, "web-5");
        assert!(status.application("E8C28D3C").is_none());
    }

    #[test]
    fn test_parse_media_status() {
        let payload = json!({
            "type": "MEDIA_STATUS",
            "status": [{
                "mediaSessionId": 7,
                "playerState": "PLAYING",
                "currentTime": 12.5,
                "media": {"contentId": "x", "duration": 3600.0}
            }]
        })
        .to_string();

        let incoming = Incoming::parse(NAMESPACE_MEDIA, &payload).unwrap();
        let entries = assert_matches!(incoming, Incoming::MediaStatus(e) => e);
        assert_eq!(entries[0].media_session_id, 7);
        assert_eq!(entries[0].player_state, "PLAYING");
        assert_eq!(entries[0].current_time, Some(12.5));
        assert_eq!(entries[0].media.as_ref().unwrap().duration, Some(3600.0));
    }

    #[test]
    fn test_parse_empty_media_status() {
        let payload = r#"{"type":"MEDIA_STATUS","status":[]}"#;
        let incoming = Incoming::parse(NAMESPACE_MEDIA, payload).unwrap();
        assert_matches!(incoming, Incoming::MediaStatus(e) if e.is_empty());
    }

    #[test]
    fn test_parse_load_failed() {
        let payload = r#"{"type":"LOAD_FAILED","requestId":3}"#;
        let incoming = Incoming::parse(NAMESPACE_MEDIA, payload).unwrap();
        assert_matches!(incoming, Incoming::Failure { kind, reason: None } if kind == "LOAD_FAILED");
    }

    #[test]
    fn test_parse_other() {
        let incoming = Incoming::parse(NAMESPACE_CONNECTION, r#"{"type":"CLOSE"}"#).unwrap();
        assert_matches!(incoming, Incoming::Other { kind } if kind == "CLOSE");
    }
}
