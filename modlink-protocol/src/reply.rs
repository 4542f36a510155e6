//! Reply frame encoding
//!
//! Every reply is a full report: byte 0 is the [`Status`], the remaining
//! bytes are command-specific payload, zero padded when unused.

use core::future::Future;

use crate::packet::FRAME_SIZE;
use crate::status::Status;

/// Payload capacity of one reply frame
pub const REPLY_PAYLOAD_SIZE: usize = FRAME_SIZE - 1;

/// Reply payload region is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReplyFull;

/// A fixed-size reply frame under construction
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reply {
    frame: [u8; FRAME_SIZE],
    /// Payload bytes written so far
    len: usize,
}

impl Reply {
    /// Create a reply with the given status and an empty payload
    pub fn new(status: Status) -> Self {
        let mut frame = [0u8; FRAME_SIZE];
        frame[0] = status.as_u8();
        Self { frame, len: 0 }
    }

    /// Create a reply carrying `payload`
    pub fn with_payload(status: Status, payload: &[u8]) -> Result<Self, ReplyFull> {
        let mut reply = Self::new(status);
        reply.extend_from_slice(payload)?;
        Ok(reply)
    }

    /// Decoded status, or `None` for an unknown status byte
    pub fn status(&self) -> Option<Status> {
        Status::from_u8(self.frame[0])
    }

    /// Raw status byte
    pub fn status_byte(&self) -> u8 {
        self.frame[0]
    }

    /// Overwrite the status byte
    pub fn set_status(&mut self, status: Status) {
        self.frame[0] = status.as_u8();
    }

    /// Payload bytes written so far
    pub fn payload(&self) -> &[u8] {
        &self.frame[1..1 + self.len]
    }

    /// Number of payload bytes written
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no payload has been written
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free payload space left
    pub fn remaining(&self) -> usize {
        REPLY_PAYLOAD_SIZE - self.len
    }

    /// Append one byte
    pub fn push(&mut self, byte: u8) -> Result<(), ReplyFull> {
        if self.len >= REPLY_PAYLOAD_SIZE {
            return Err(ReplyFull);
        }
        self.frame[1 + self.len] = byte;
        self.len += 1;
        Ok(())
    }

    /// Append a slice; nothing is written if it does not fit entirely
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<(), ReplyFull> {
        if bytes.len() > self.remaining() {
            return Err(ReplyFull);
        }
        let start = 1 + self.len;
        self.frame[start..start + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Zero the payload, keeping the status byte
    pub fn clear_payload(&mut self) {
        self.frame[1..].fill(0);
        self.len = 0;
    }

    /// The complete report
    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.frame
    }
}

/// Transport side of the reply path
///
/// On the module this sends a raw HID report. Streaming commands call
/// `send` once per frame, so implementations must not buffer indefinitely.
pub trait ReplySink {
    /// Transport error
    type Error;

    /// Send one reply frame
    fn send(&mut self, reply: &Reply) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Collects replies in memory; fails once full
impl<const N: usize> ReplySink for heapless::Vec<Reply, N> {
    type Error = ReplyFull;

    async fn send(&mut self, reply: &Reply) -> Result<(), ReplyFull> {
        self.push(reply.clone()).map_err(|_| ReplyFull)
    }
}
