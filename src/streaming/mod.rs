//! Media streaming module.
//!
//! Serves local files to the playback device over plain HTTP with single
//! range support.
//!
//! # Routes
//!
//! Every path registered in the [`Inventory`] is served by [`serve_file`]:
//! - `GET /video` - Video file with range support
//! - `GET /subtitles` - Subtitle file with range support (optional)
//!
//! `HEAD` is accepted on the same paths. There is no access log; the
//! terminal is reserved for the playback status line.

mod content_type;
mod direct;
mod inventory;
mod range;

pub use content_type::{guess_content_type, DEFAULT_CONTENT_TYPE};
pub use direct::{serve_file, CHUNK_SIZE};
pub use inventory::{FileEntry, Inventory};
pub use range::{ByteRange, RangeNotSatisfiable};

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

/// Create the file serving router.
///
/// All responses, including errors, allow any origin; cast receivers fetch
/// media cross-origin.
pub fn file_router(inventory: Arc<Inventory>) -> Router {
    Router::new()
        .fallback(serve_file)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .with_state(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_router_creation() {
        let _router: Router = file_router(Arc::new(Inventory::new()));
    }
}
