//! Fixed 16-byte wire header (§4.9), little-endian:
//! `magic:u32 | version:u16 | type:u8 | flags:u8 | payload_len:i32 | reserved:u32`.
//!
//! Mirrors the fixed/variable split `wal::entry::WalRecord` uses for its own
//! framing, scaled down to the protocol's smaller, fixed-size header.

use crate::error::{Result, StoreError};

pub const PROTOCOL_MAGIC: u32 = 0x4952_4231; // "IRB1"
pub const PROTOCOL_VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Handshake = 0,
    Authentication = 1,
    Command = 2,
    Response = 3,
    Error = 4,
    Ping = 5,
    Pong = 6,
    Transaction = 7,
    BulkOperation = 8,
    Notification = 9,
}

impl MessageType {
    pub fn from_u8(v: u8) -> Result<Self> {
        Ok(match v {
            0 => MessageType::Handshake,
            1 => MessageType::Authentication,
            2 => MessageType::Command,
            3 => MessageType::Response,
            4 => MessageType::Error,
            5 => MessageType::Ping,
            6 => MessageType::Pong,
            7 => MessageType::Transaction,
            8 => MessageType::BulkOperation,
            9 => MessageType::Notification,
            _ => return Err(StoreError::MalformedHeader),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub version: u16,
    pub message_type: MessageType,
    pub flags: u8,
    pub payload_len: i32,
}

impl Header {
    pub fn new(message_type: MessageType, payload_len: usize, max_payload: usize) -> Result<Self> {
        if payload_len > max_payload {
            return Err(StoreError::PayloadTooLarge(payload_len));
        }
        Ok(Header {
            version: PROTOCOL_VERSION,
            message_type,
            flags: 0,
            payload_len: payload_len as i32,
        })
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&PROTOCOL_MAGIC.to_le_bytes());
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6] = self.message_type as u8;
        buf[7] = self.flags;
        buf[8..12].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[12..16].copy_from_slice(&0u32.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8], max_payload: usize) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(StoreError::MalformedHeader);
        }
        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if magic != PROTOCOL_MAGIC {
            return Err(StoreError::MalformedHeader);
        }
        let version = u16::from_le_bytes(buf[4..6].try_into().unwrap());
        if version != PROTOCOL_VERSION {
            return Err(StoreError::BadVersion(version));
        }
        let message_type = MessageType::from_u8(buf[6])?;
        let flags = buf[7];
        let payload_len = i32::from_le_bytes(buf[8..12].try_into().unwrap());
        if payload_len < 0 || payload_len as usize > max_payload {
            return Err(StoreError::PayloadTooLarge(payload_len.max(0) as usize));
        }
        Ok(Header {
            version,
            message_type,
            flags,
            payload_len,
        })
    }
}
