//! Module Raw HID Protocol
//!
//! This crate defines the packet protocol between the host application and
//! the display module. The host manages a small file store on the module and
//! picks what the display shows; every exchange is one fixed-size raw HID
//! report in each direction.
//!
//! # Protocol Overview
//!
//! Requests:
//! ```text
//! ┌───────┬─────────┬───────────┬─────────────┐
//! │ MAGIC │ COMMAND │ PACKET ID │ PAYLOAD     │
//! │ 1B    │ 1B      │ 4B (LE)   │ 0–26B       │
//! └───────┴─────────┴───────────┴─────────────┘
//! ```
//!
//! Replies:
//! ```text
//! ┌────────┬──────────────────────────────┐
//! │ STATUS │ PAYLOAD (zero padded)        │
//! │ 1B     │ 31B                          │
//! └────────┴──────────────────────────────┘
//! ```
//!
//! Commands that stream (directory listings, file reads) send several reply
//! frames, each with its own status byte, and finish with a status frame.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod packet;
pub mod reply;
pub mod status;

pub use command::{CommandId, COMMAND_BASE, COMMAND_COUNT};
pub use packet::{Packet, PacketError, FRAME_SIZE, HEADER_SIZE, MAX_PAYLOAD_SIZE, PACKET_MAGIC};
pub use reply::{Reply, ReplyFull, ReplySink, REPLY_PAYLOAD_SIZE};
pub use status::Status;
