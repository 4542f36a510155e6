//! Command error taxonomy
//!
//! Every handler failure is a [`CommandError`]. Dispatch converts it into
//! the reply's status byte with [`CommandError::status`]; nothing escapes
//! as a panic.

use modlink_hal::{DisplayError, StorageError};
use modlink_protocol::{PacketError, ReplyFull, Status};

/// Payload validation failures, detected before any storage call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidationError {
    /// Payload is empty or shorter than the command requires
    InsufficientData,
    /// Path does not fit the path limit
    PathTooLong,
    /// Path is not valid UTF-8
    InvalidPath,
    /// A numeric field is out of range
    OutOfRange,
}

/// Errors produced while executing a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Bad length, bad magic or unknown command id
    Protocol(PacketError),
    /// Payload rejected before touching storage
    Validation(ValidationError),
    /// Storage adapter failure
    Storage(StorageError),
    /// Frame submission failure
    Display(DisplayError),
    /// `write`/`close` without an open file
    NotOpen,
    /// `open` while another file is open
    AlreadyOpen,
    /// Packet id does not follow the previous write
    Sequence { expected: u32, received: u32 },
    /// Image file holds no complete frame
    InvalidAsset,
    /// Raw display data ran past the end of the frame
    DisplayOverflow,
    /// Store accepted fewer bytes than a full chunk
    ShortWrite { written: usize, expected: usize },
    /// The reply transport failed mid-stream
    Transport,
}

impl CommandError {
    /// Status byte reported for this error
    pub fn status(&self) -> Status {
        match self {
            CommandError::Protocol(_) | CommandError::Validation(_) => Status::InvalidCommand,
            CommandError::Storage(err) => match err {
                StorageError::NotFound => Status::NotFound,
                StorageError::Exists => Status::AlreadyExists,
                StorageError::NoSpace => Status::StoreFull,
                StorageError::NotEmpty => Status::NameInUse,
                _ => Status::InvalidCommand,
            },
            CommandError::Display(_) => Status::InvalidCommand,
            CommandError::NotOpen => Status::NotOpen,
            CommandError::AlreadyOpen => Status::NameInUse,
            CommandError::Sequence { .. } => Status::SequenceError,
            CommandError::InvalidAsset => Status::HeightOutOfBounds,
            CommandError::DisplayOverflow => Status::WidthOutOfBounds,
            CommandError::ShortWrite { .. } => Status::StoreFull,
            CommandError::Transport => Status::InvalidCommand,
        }
    }

    /// True if the error came from the store (the open write handle is dropped)
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            CommandError::Storage(_) | CommandError::ShortWrite { .. }
        )
    }
}

impl From<PacketError> for CommandError {
    fn from(e: PacketError) -> Self {
        CommandError::Protocol(e)
    }
}

impl From<ReplyFull> for CommandError {
    fn from(_: ReplyFull) -> Self {
        CommandError::Protocol(PacketError::PayloadTooLarge)
    }
}

impl From<ValidationError> for CommandError {
    fn from(e: ValidationError) -> Self {
        CommandError::Validation(e)
    }
}

impl From<StorageError> for CommandError {
    fn from(e: StorageError) -> Self {
        CommandError::Storage(e)
    }
}

impl From<DisplayError> for CommandError {
    fn from(e: DisplayError) -> Self {
        CommandError::Display(e)
    }
}
