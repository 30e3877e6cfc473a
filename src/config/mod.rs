mod types;

pub use types::*;

use anyhow::Result;

/// Validate settings before anything is started.
pub fn validate_settings(server: &ServerSettings, playback: &PlaybackSettings) -> Result<()> {
    if server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if playback.wait_timeout.is_zero() {
        anyhow::bail!("Wait timeout must be greater than 0");
    }

    if playback.poll_interval.is_zero() {
        anyhow::bail!("Poll interval must be greater than 0");
    }

    if server.advertised_ip.is_some_and(|ip| ip.is_unspecified()) {
        tracing::warn!("Local IP is unspecified; the device will not be able to reach it");
    }

    Ok(())
}
