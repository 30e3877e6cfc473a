//! Blocking TLS control channel to a cast device.

use std::io::{ErrorKind, Read, Write};
use std::net::{IpAddr, Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use native_tls::{TlsConnector, TlsStream};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::frame::{take_frame, CastFrame};
use super::protocol::{Incoming, NAMESPACE_CONNECTION, NAMESPACE_HEARTBEAT};
use super::CastTarget;
use crate::error::{Error, Result};

const SENDER_ID: &str = "sender-castplay";

/// How long a single read blocks before yielding back to the caller.
const READ_TIMEOUT: Duration = Duration::from_millis(200);
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Byte stream the channel runs over.
///
/// Reads are expected to give up with `WouldBlock` or `TimedOut` after a
/// short while so that deadlines and cancellation are noticed.
pub trait CastStream: Read + Write + Send + 'static {
    /// Close the stream. Errors are ignored; the device may already have
    /// gone away.
    fn close(&mut self, timeout: Duration);
}

impl CastStream for TlsStream<TcpStream> {
    fn close(&mut self, timeout: Duration) {
        let _ = self.get_ref().set_write_timeout(Some(timeout));
        let _ = self.shutdown();
        let _ = self.get_ref().shutdown(Shutdown::Both);
    }
}

/// A message that was not consumed by the channel itself.
#[derive(Debug)]
pub struct Message {
    pub source_id: String,
    pub namespace: String,
    pub payload: String,
}

impl Message {
    pub fn parse(&self) -> Result<Incoming> {
        Ok(Incoming::parse(&self.namespace, &self.payload)?)
    }
}

/// The connection to the device plus a receive buffer.
///
/// Heartbeat pings are answered transparently while receiving.
pub struct CastChannel<S = TlsStream<TcpStream>> {
    stream: S,
    pending: Vec<u8>,
    next_request_id: i64,
    local_ip: IpAddr,
}

impl CastChannel {
    /// Open the TCP connection and complete the TLS handshake.
    ///
    /// Receivers present self-signed certificates, so verification is off.
    pub fn connect(target: &CastTarget, timeout: Duration) -> Result<Self> {
        let addr = (target.host.as_str(), target.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::cast(format!("could not resolve {}", target)))?;

        let tcp = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| Error::cast(format!("failed to connect to {}: {}", target, e)))?;
        tcp.set_nodelay(true)?;
        tcp.set_read_timeout(Some(timeout))?;
        tcp.set_write_timeout(Some(WRITE_TIMEOUT))?;
        let local_ip = tcp.local_addr()?.ip();

        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()?;
        let stream = connector
            .connect(&target.host, tcp)
            .map_err(|e| Error::cast(format!("TLS handshake with {} failed: {}", target, e)))?;
        stream.get_ref().set_read_timeout(Some(READ_TIMEOUT))?;

        tracing::debug!(device = %target, local_ip = %local_ip, "Cast channel connected");

        Ok(Self::new(stream, local_ip))
    }
}

impl<S: CastStream> CastChannel<S> {
    /// Wrap an already connected stream.
    pub fn new(stream: S, local_ip: IpAddr) -> Self {
        Self {
            stream,
            pending: Vec::new(),
            next_request_id: 1,
            local_ip,
        }
    }

    /// Local address of the control socket, reachable from the device.
    pub fn local_ip(&self) -> IpAddr {
        self.local_ip
    }

    /// Send a raw payload.
    pub fn send(&mut self, namespace: &str, destination_id: &str, payload: &Value) -> Result<()> {
        let frame = CastFrame {
            source_id: SENDER_ID.to_string(),
            destination_id: destination_id.to_string(),
            namespace: namespace.to_string(),
            payload: payload.to_string(),
        };
        tracing::trace!(namespace, destination_id, payload = %frame.payload, "Cast send");
        self.stream.write_all(&frame.encode()?)?;
        Ok(())
    }

    /// Send a request of `kind`, merging `body` into the payload and adding
    /// a fresh `requestId`. Returns the request id.
    pub fn request(
        &mut self,
        namespace: &str,
        destination_id: &str,
        kind: &str,
        body: Value,
    ) -> Result<i64> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let mut payload = match body {
            Value::Object(map) => Value::Object(map),
            Value::Null => json!({}),
            other => {
                return Err(Error::InvalidInput(format!(
                    "request body must be an object, got {}",
                    other
                )))
            }
        };
        payload["type"] = json!(kind);
        payload["requestId"] = json!(request_id);

        self.send(namespace, destination_id, &payload)?;
        Ok(request_id)
    }

    /// Open a virtual connection to `destination_id`.
    pub fn open_virtual(&mut self, destination_id: &str) -> Result<()> {
        self.send(
            NAMESPACE_CONNECTION,
            destination_id,
            &json!({"type": "CONNECT", "origin": {}}),
        )
    }

    /// Close the virtual connection to `destination_id`.
    pub fn close_virtual(&mut self, destination_id: &str) -> Result<()> {
        self.send(NAMESPACE_CONNECTION, destination_id, &json!({"type": "CLOSE"}))
    }

    /// Receive the next message, or `None` if nothing arrived within one read
    /// timeout.
    pub fn recv(&mut self) -> Result<Option<Message>> {
        loop {
            while let Some(frame) = take_frame(&mut self.pending)? {
                tracing::trace!(namespace = %frame.namespace, payload = %frame.payload, "Cast recv");
                if frame.namespace == NAMESPACE_HEARTBEAT {
                    self.answer_heartbeat(&frame)?;
                    continue;
                }
                return Ok(Some(Message {
                    source_id: frame.source_id,
                    namespace: frame.namespace,
                    payload: frame.payload,
                }));
            }

            let mut buf = [0u8; 4096];
            match self.stream.read(&mut buf) {
                Ok(0) => return Err(Error::cast("connection closed by device")),
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(None)
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Receive until `select` accepts a message or `deadline` passes.
    ///
    /// Messages `select` declines are dropped. `cancel` is checked between
    /// reads and ends the wait with [`Error::Cancelled`].
    pub fn recv_until<T>(
        &mut self,
        deadline: Instant,
        cancel: &CancellationToken,
        mut select: impl FnMut(&Message) -> Result<Option<T>>,
    ) -> Result<Option<T>> {
        while Instant::now() < deadline {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if let Some(message) = self.recv()? {
                if let Some(found) = select(&message)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    /// Close the underlying stream.
    pub fn shutdown(&mut self, timeout: Duration) {
        self.stream.close(timeout);
    }

    fn answer_heartbeat(&mut self, frame: &CastFrame) -> Result<()> {
        let is_ping = serde_json::from_str::<Value>(&frame.payload)
            .ok()
            .and_then(|v| v.get("type").and_then(Value::as_str).map(|t| t == "PING"))
            .unwrap_or(false);
        if is_ping {
            self.send(NAMESPACE_HEARTBEAT, &frame.source_id, &json!({"type": "PONG"}))?;
        }
        Ok(())
    }
}
