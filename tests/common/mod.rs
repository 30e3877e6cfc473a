//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which writes fixture files into a temp directory,
//! registers them in an [`Inventory`], and starts the file server on a random
//! port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use castplay::server::start_server;
use castplay::streaming::{FileEntry, Inventory};

/// Test harness owning the fixture directory and the server address.
pub struct TestHarness {
    pub dir: tempfile::TempDir,
    pub addr: SocketAddr,
}

impl TestHarness {
    /// Serve `files` (url path, file name, contents, content type) on a
    /// random port.
    pub async fn with_files(files: &[(&str, &str, &[u8], &str)]) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        let mut inventory = Inventory::new();
        for (url_path, name, data, content_type) in files {
            let path = dir.path().join(name);
            std::fs::write(&path, data).expect("failed to write fixture");
            inventory.insert(
                *url_path,
                FileEntry::stat(&path, *content_type).expect("failed to stat fixture"),
            );
        }

        let handle = start_server("127.0.0.1:0".parse().unwrap(), Arc::new(inventory))
            .await
            .expect("failed to start server");

        Self {
            dir,
            addr: handle.local_addr,
        }
    }

    /// Serve a single video file at `/video`.
    pub async fn with_video(data: &[u8]) -> Self {
        Self::with_files(&[("/video", "video.mp4", data, "video/mp4")]).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn fixture_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Deterministic, non-repeating-per-256 test data.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}
