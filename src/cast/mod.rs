//! Google Cast v2 client.
//!
//! Only what a single playback needs: connect to a known device, launch the
//! default media receiver, load one media URL (with an optional subtitle
//! track), poll status, stop and close. Device discovery is not handled here;
//! the device address comes from the command line.

mod channel;
mod frame;
mod protocol;
mod session;
#[cfg(test)]
mod test_fixtures;

pub use channel::{CastChannel, CastStream, Message};
pub use frame::{CastFrame, MAX_FRAME_LEN};
pub use protocol::{Incoming, LoadCommand};
pub use session::CastSession;

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Port the cast control channel listens on.
pub const DEFAULT_CAST_PORT: u16 = 8009;

/// Address of a cast device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastTarget {
    pub host: String,
    pub port: u16,
}

impl FromStr for CastTarget {
    type Err = Error;

    /// Accepts `host`, `host:port`, a bare IPv6 address, or `[v6]:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidInput("empty device address".to_string()));
        }

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| Error::InvalidInput(format!("invalid device address: {}", s)))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => Some(port),
                None if tail.is_empty() => None,
                None => {
                    return Err(Error::InvalidInput(format!("invalid device address: {}", s)))
                }
            };
            (host, port)
        } else {
            match s.split_once(':') {
                // More than one colon without brackets is a bare IPv6 address.
                Some((host, port)) if !port.contains(':') => (host, Some(port)),
                _ => (s, None),
            }
        };

        let port = match port {
            Some(port) => port
                .parse()
                .map_err(|_| Error::InvalidInput(format!("invalid device port: {}", port)))?,
            None => DEFAULT_CAST_PORT,
        };

        if host.is_empty() {
            return Err(Error::InvalidInput(format!("invalid device address: {}", s)));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for CastTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
