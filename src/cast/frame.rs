//! Cast v2 wire framing.
//!
//! Every message on the control channel is a 4-byte big-endian length
//! followed by a protobuf-encoded `CastMessage`. Only string payloads are
//! used, so the encoder writes a fixed field layout and the decoder keeps
//! just the fields we route on.

use crate::error::{Error, Result};

/// Upper bound on a single frame; receivers never send anything near this.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

const FIELD_PROTOCOL_VERSION: u32 = 1;
const FIELD_SOURCE_ID: u32 = 2;
const FIELD_DESTINATION_ID: u32 = 3;
const FIELD_NAMESPACE: u32 = 4;
const FIELD_PAYLOAD_TYPE: u32 = 5;
const FIELD_PAYLOAD_UTF8: u32 = 6;

const PROTOCOL_VERSION_CASTV2_1_0: u64 = 0;
const PAYLOAD_TYPE_STRING: u64 = 0;

const WIRE_VARINT: u8 = 0;
const WIRE_LEN: u8 = 2;

/// One message on the control channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CastFrame {
    pub source_id: String,
    pub destination_id: String,
    pub namespace: String,
    pub payload: String,
}

impl CastFrame {
    /// Encode with the length prefix, ready to write to the socket.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut message = Vec::with_capacity(
            self.source_id.len() + self.destination_id.len() + self.namespace.len()
                + self.payload.len()
                + 16,
        );
        write_varint_field(&mut message, FIELD_PROTOCOL_VERSION, PROTOCOL_VERSION_CASTV2_1_0);
        write_string_field(&mut message, FIELD_SOURCE_ID, &self.source_id);
        write_string_field(&mut message, FIELD_DESTINATION_ID, &self.destination_id);
        write_string_field(&mut message, FIELD_NAMESPACE, &self.namespace);
        write_varint_field(&mut message, FIELD_PAYLOAD_TYPE, PAYLOAD_TYPE_STRING);
        write_string_field(&mut message, FIELD_PAYLOAD_UTF8, &self.payload);

        if message.len() > MAX_FRAME_LEN {
            return Err(Error::protocol(format!(
                "frame of {} bytes exceeds limit",
                message.len()
            )));
        }

        let mut frame = Vec::with_capacity(4 + message.len());
        frame.extend_from_slice(&(message.len() as u32).to_be_bytes());
        frame.extend_from_slice(&message);
        Ok(frame)
    }

    /// Decode a message body (without the length prefix).
    ///
    /// Unknown varint and length-delimited fields are skipped.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = 0usize;
        let mut frame = CastFrame::default();

        while cursor < bytes.len() {
            let key = read_varint(bytes, &mut cursor)
                .ok_or_else(|| Error::protocol("truncated field key"))?;
            let field = (key >> 3) as u32;
            let wire_type = (key & 0x07) as u8;

            match wire_type {
                WIRE_VARINT => {
                    read_varint(bytes, &mut cursor)
                        .ok_or_else(|| Error::protocol("truncated varint field"))?;
                }
                WIRE_LEN => {
                    let len = read_varint(bytes, &mut cursor)
                        .ok_or_else(|| Error::protocol("truncated field length"))?
                        as usize;
                    let end = cursor
                        .checked_add(len)
                        .filter(|end| *end <= bytes.len())
                        .ok_or_else(|| Error::protocol("field length out of bounds"))?;
                    let value = &bytes[cursor..end];
                    cursor = end;

                    let target = match field {
                        FIELD_SOURCE_ID => &mut frame.source_id,
                        FIELD_DESTINATION_ID => &mut frame.destination_id,
                        FIELD_NAMESPACE => &mut frame.namespace,
                        FIELD_PAYLOAD_UTF8 => &mut frame.payload,
                        _ => continue,
                    };
                    *target = String::from_utf8(value.to_vec())
                        .map_err(|_| Error::protocol("invalid utf8 in string field"))?;
                }
                other => {
                    return Err(Error::protocol(format!("unsupported wire type {}", other)));
                }
            }
        }

        Ok(frame)
    }
}

/// Split one complete frame off the front of `buf`, if there is one.
pub fn take_frame(buf: &mut Vec<u8>) -> Result<Option<CastFrame>> {
    let Some(prefix) = buf.get(..4) else {
        return Ok(None);
    };
    let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::protocol(format!("frame of {} bytes exceeds limit", len)));
    }
    if buf.len() < 4 + len {
        return Ok(None);
    }

    let frame = CastFrame::decode(&buf[4..4 + len])?;
    buf.drain(..4 + len);
    Ok(Some(frame))
}

fn write_varint_field(out: &mut Vec<u8>, field: u32, value: u64) {
    write_varint(out, (u64::from(field) << 3) | u64::from(WIRE_VARINT));
    write_varint(out, value);
}

fn write_string_field(out: &mut Vec<u8>, field: u32, value: &str) {
    write_varint(out, (u64::from(field) << 3) | u64::from(WIRE_LEN));
    write_varint(out, value.len() as u64);
    out.extend_from_slice(value.as_bytes());
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn read_varint(bytes: &[u8], cursor: &mut usize) -> Option<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    while shift < 64 {
        let byte = *bytes.get(*cursor)?;
        *cursor += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Some(value);
        }
        shift += 7;
    }
    None
}
