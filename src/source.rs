//! Startup inputs: local files to serve or remote URLs to pass through.

use std::net::SocketAddr;

use crate::error::Result;
use crate::streaming::{guess_content_type, FileEntry, Inventory};

/// URL path the video is served under.
pub const VIDEO_PATH: &str = "/video";
/// URL path the subtitles are served under.
pub const SUBTITLES_PATH: &str = "/subtitles";

/// A prepared media or subtitle source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    /// URL handed to the device.
    pub url: String,
    pub content_type: String,
    /// Set when the source is a local file that we serve ourselves.
    pub local: Option<LocalFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub url_path: String,
    pub entry: FileEntry,
}

/// Whether `source` is an absolute URL the device can fetch directly.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Prepare `source` for playback.
///
/// Remote URLs are passed through untouched. Local paths are stat-ed once and
/// will be served at `url_path` on `server_addr`. Without an explicit
/// `content_type` one is guessed from the extension.
pub fn prepare_source(
    source: &str,
    content_type: Option<&str>,
    server_addr: SocketAddr,
    url_path: &str,
) -> Result<MediaSource> {
    let content_type = content_type
        .map(ToString::to_string)
        .unwrap_or_else(|| guess_content_type(source).to_string());

    if is_remote(source) {
        return Ok(MediaSource {
            url: source.to_string(),
            content_type,
            local: None,
        });
    }

    let entry = FileEntry::stat(source, content_type.as_str())?;
    tracing::debug!(
        path = %entry.local_path.display(),
        size = entry.size,
        url_path,
        "Prepared local source"
    );

    Ok(MediaSource {
        url: format!("http://{}{}", server_addr, url_path),
        content_type,
        local: Some(LocalFile {
            url_path: url_path.to_string(),
            entry,
        }),
    })
}

/// Collect the local files of `sources` into the server inventory.
pub fn build_inventory<'a>(sources: impl IntoIterator<Item = &'a MediaSource>) -> Inventory {
    sources
        .into_iter()
        .filter_map(|source| source.local.as_ref())
        .map(|local| (local.url_path.clone(), local.entry.clone()))
        .collect()
}
