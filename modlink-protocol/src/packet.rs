//! Request packet decoding
//!
//! Packet format:
//! - MAGIC (1 byte): 0x09
//! - COMMAND (1 byte): command id, see [`CommandId`]
//! - PACKET ID (4 bytes): little-endian sequence number
//! - PAYLOAD (0-26 bytes): command-specific data

use crate::command::CommandId;

/// Raw HID report size
pub const FRAME_SIZE: usize = 32;

/// Header size (MAGIC + COMMAND + PACKET ID)
pub const HEADER_SIZE: usize = 6;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = FRAME_SIZE - HEADER_SIZE;

/// Magic byte identifying module packets
pub const PACKET_MAGIC: u8 = 0x09;

/// Errors that can occur while decoding or encoding a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Frame shorter than the header or longer than a report
    BadLength(usize),
    /// Leading byte is not [`PACKET_MAGIC`]
    InvalidMagic(u8),
    /// Command id outside the registered range
    UnknownCommand(u8),
    /// Payload exceeds [`MAX_PAYLOAD_SIZE`]
    PayloadTooLarge,
}

/// A decoded request packet, borrowing its payload from the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    pub command: CommandId,
    pub packet_id: u32,
    pub payload: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Decode a frame
    ///
    /// Checks run in order: length, magic, command id.
    pub fn parse(frame: &'a [u8]) -> Result<Self, PacketError> {
        if frame.len() < HEADER_SIZE || frame.len() > FRAME_SIZE {
            return Err(PacketError::BadLength(frame.len()));
        }
        if frame[0] != PACKET_MAGIC {
            return Err(PacketError::InvalidMagic(frame[0]));
        }
        let command = CommandId::try_from(frame[1])?;
        let packet_id = u32::from_le_bytes([frame[2], frame[3], frame[4], frame[5]]);

        Ok(Self {
            command,
            packet_id,
            payload: &frame[HEADER_SIZE..],
        })
    }

    /// Encode a request into a report buffer (host side)
    ///
    /// Returns the number of meaningful bytes; the rest of `buffer` is zeroed.
    pub fn encode(
        command: CommandId,
        packet_id: u32,
        payload: &[u8],
        buffer: &mut [u8; FRAME_SIZE],
    ) -> Result<usize, PacketError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge);
        }

        buffer.fill(0);
        buffer[0] = PACKET_MAGIC;
        buffer[1] = command.as_u8();
        buffer[2..HEADER_SIZE].copy_from_slice(&packet_id.to_le_bytes());
        buffer[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);

        Ok(HEADER_SIZE + payload.len())
    }
}
