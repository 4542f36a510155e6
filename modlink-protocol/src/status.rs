//! Reply status codes

/// Status byte leading every reply frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Status {
    Success = 0x00,
    /// Entry already exists
    AlreadyExists = 0xE1,
    /// No space left in the store
    StoreFull = 0xE2,
    /// Image width out of bounds
    WidthOutOfBounds = 0xE3,
    /// Image height out of bounds
    HeightOutOfBounds = 0xE4,
    /// Name or handle already in use
    NameInUse = 0xE5,
    /// Entry not found
    NotFound = 0xE6,
    /// No file is open for writing
    NotOpen = 0xE7,
    /// Packet id out of sequence
    SequenceError = 0xE8,
    /// Free space report (payload carries the numbers)
    FlashRemaining = 0xE9,
    /// Malformed, unknown or rejected command
    InvalidCommand = 0xEF,
}

impl Status {
    /// Decode a status byte
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Success),
            0xE1 => Some(Status::AlreadyExists),
            0xE2 => Some(Status::StoreFull),
            0xE3 => Some(Status::WidthOutOfBounds),
            0xE4 => Some(Status::HeightOutOfBounds),
            0xE5 => Some(Status::NameInUse),
            0xE6 => Some(Status::NotFound),
            0xE7 => Some(Status::NotOpen),
            0xE8 => Some(Status::SequenceError),
            0xE9 => Some(Status::FlashRemaining),
            0xEF => Some(Status::InvalidCommand),
            _ => None,
        }
    }

    /// Wire value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns true for the success sentinel
    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}
