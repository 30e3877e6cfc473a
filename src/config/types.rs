use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Where the local file server listens and how the device reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Address to bind. `0.0.0.0` unless a local IP was given.
    pub bind_ip: IpAddr,

    /// Address put into media URLs. Falls back to the address of the
    /// control connection to the device when unset.
    pub advertised_ip: Option<IpAddr>,

    pub port: u16,
}

fn default_bind_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_ip: default_bind_ip(),
            advertised_ip: None,
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Bind to `local_ip` and advertise it, or bind everywhere when unset.
    pub fn with_local_ip(local_ip: Option<IpAddr>, port: u16) -> Self {
        Self {
            bind_ip: local_ip.unwrap_or_else(default_bind_ip),
            advertised_ip: local_ip,
            port,
        }
    }
}

/// Timing of the playback monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSettings {
    /// How long the device may stay idle before playback counts as over.
    pub idle_timeout: Duration,

    /// Bound on connecting and on waiting for the device to become active.
    pub wait_timeout: Duration,

    /// Delay between status polls.
    pub poll_interval: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(10),
            wait_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
        }
    }
}
