use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use super::channel::{CastChannel, CastStream};
use super::frame::{take_frame, CastFrame};

/// Stand-in for a read timeout on an idle socket.
const IDLE_READ: Duration = Duration::from_millis(10);

/// In-memory device connection. Frames pushed by the test are read by the
/// channel; everything the channel writes is recorded.
#[derive(Clone, Default)]
pub struct ScriptedStream {
    inbound: Arc<Mutex<VecDeque<u8>>>,
    outbound: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
}

impl ScriptedStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message from the device.
    pub fn push(&self, source_id: &str, namespace: &str, payload: Value) {
        let frame = CastFrame {
            source_id: source_id.to_string(),
            destination_id: "*".to_string(),
            namespace: namespace.to_string(),
            payload: payload.to_string(),
        };
        self.inbound
            .lock()
            .extend(frame.encode().expect("fixture frame too large"));
    }

    /// Frames written by the channel so far.
    pub fn sent(&self) -> Vec<CastFrame> {
        let mut buf = self.outbound.lock().clone();
        let mut frames = Vec::new();
        while let Some(frame) = take_frame(&mut buf).expect("channel wrote a bad frame") {
            frames.push(frame);
        }
        frames
    }

    /// The `type` of every payload written so far.
    pub fn sent_types(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|frame| {
                let payload: Value = serde_json::from_str(&frame.payload).unwrap();
                payload["type"].as_str().unwrap_or_default().to_string()
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inbound = self.inbound.lock();
        if inbound.is_empty() {
            drop(inbound);
            std::thread::sleep(IDLE_READ);
            return Err(ErrorKind::WouldBlock.into());
        }
        let n = buf.len().min(inbound.len());
        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outbound.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CastStream for ScriptedStream {
    fn close(&mut self, _timeout: Duration) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn scripted_channel(stream: &ScriptedStream) -> CastChannel<ScriptedStream> {
    CastChannel::new(stream.clone(), IpAddr::V4(Ipv4Addr::LOCALHOST))
}
