//! Encodes/decodes a full wire record: header, JSON payload, and a trailing
//! CRC-32 checksum over the header+payload bytes (§4.9). Checksum placement
//! mirrors `wal::entry::WalRecord::serialize`, which appends its CRC after
//! the variable-length payload rather than in the fixed header.

use super::header::{Header, MessageType, HEADER_SIZE};
use crate::error::{Result, StoreError};
use serde::Serialize;

pub const CHECKSUM_SIZE: usize = 4;

#[derive(Debug, Clone)]
pub struct Message {
    pub message_type: MessageType,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(message_type: MessageType, payload: Vec<u8>) -> Self {
        Message {
            message_type,
            payload,
        }
    }

    pub fn from_json<T: Serialize>(message_type: MessageType, value: &T) -> Result<Self> {
        Ok(Message {
            message_type,
            payload: serde_json::to_vec(value)?,
        })
    }

    pub fn payload_as<'a, T: serde::Deserialize<'a>>(&'a self) -> Result<T> {
        serde_json::from_slice(&self.payload).map_err(|e| StoreError::ParseError(e.to_string()))
    }

    /// Encode as `header || payload || crc32(header || payload)`.
    pub fn encode(&self, max_payload: usize) -> Result<Vec<u8>> {
        let header = Header::new(self.message_type, self.payload.len(), max_payload)?;
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len() + CHECKSUM_SIZE);
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(&self.payload);
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Decode a full record, validating header, size bound, and checksum.
    pub fn decode(buf: &[u8], max_payload: usize) -> Result<Self> {
        let header = Header::decode(buf, max_payload)?;
        let payload_len = header.payload_len as usize;
        let total = HEADER_SIZE + payload_len + CHECKSUM_SIZE;
        if buf.len() < total {
            return Err(StoreError::MalformedHeader);
        }
        let body_end = HEADER_SIZE + payload_len;
        let stored_crc = u32::from_le_bytes(buf[body_end..body_end + CHECKSUM_SIZE].try_into().unwrap());
        let computed_crc = crc32fast::hash(&buf[..body_end]);
        if stored_crc != computed_crc {
            return Err(StoreError::BadChecksum);
        }
        Ok(Message {
            message_type: header.message_type,
            payload: buf[HEADER_SIZE..body_end].to_vec(),
        })
    }
}

/// A connection begins with a client `Handshake`; the server replies with a
/// `Handshake` message of its own to acknowledge. Any other first message is
/// rejected.
pub fn validate_handshake_sequence(first: &Message) -> Result<()> {
    if first.message_type != MessageType::Handshake {
        return Err(StoreError::MalformedHeader);
    }
    Ok(())
}
