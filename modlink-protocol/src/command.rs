//! Command identifiers
//!
//! Command ids are contiguous from [`COMMAND_BASE`]. Decoding subtracts the
//! base and bounds-checks against [`COMMAND_COUNT`]; the dispatcher then
//! matches on the [`CommandId`] variant.

use crate::packet::PacketError;

/// First command id of the module command range
pub const COMMAND_BASE: u8 = 0x50;

/// Number of registered commands
pub const COMMAND_COUNT: usize = CommandId::ALL.len();

/// Module commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandId {
    /// List directory entries
    Ls = 0x50,
    /// Change the working directory
    Cd = 0x51,
    /// Print the working directory
    Pwd = 0x52,
    /// Remove a file or empty directory
    Rm = 0x53,
    /// Create a directory
    Mkdir = 0x54,
    /// Create an empty file
    Touch = 0x55,
    /// Stream a file's contents
    Cat = 0x56,
    /// Open a file for appending
    Open = 0x57,
    /// Append data to the open file
    Write = 0x58,
    /// Flush and close the open file
    Close = 0x59,
    /// Reformat the whole store
    FormatFilesystem = 0x5A,
    /// Report free space
    FlashRemaining = 0x5B,
    /// Show a static image or start an animation
    ChooseImage = 0x5C,
    /// Stream raw pixels straight to the display
    WriteDisplay = 0x5D,
    /// Set the wall clock
    SetTime = 0x5E,
}

impl CommandId {
    /// Every command, ordered by id
    pub const ALL: [CommandId; 15] = [
        CommandId::Ls,
        CommandId::Cd,
        CommandId::Pwd,
        CommandId::Rm,
        CommandId::Mkdir,
        CommandId::Touch,
        CommandId::Cat,
        CommandId::Open,
        CommandId::Write,
        CommandId::Close,
        CommandId::FormatFilesystem,
        CommandId::FlashRemaining,
        CommandId::ChooseImage,
        CommandId::WriteDisplay,
        CommandId::SetTime,
    ];

    /// Decode a command id byte
    pub fn from_u8(id: u8) -> Option<Self> {
        let index = id.checked_sub(COMMAND_BASE)? as usize;
        if index >= COMMAND_COUNT {
            return None;
        }
        Some(Self::ALL[index])
    }

    /// Wire value
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CommandId {
    type Error = PacketError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_u8(id).ok_or(PacketError::UnknownCommand(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_contiguous() {
        for (offset, command) in CommandId::ALL.iter().enumerate() {
            assert_eq!(command.as_u8(), COMMAND_BASE + offset as u8);
        }
    }

    #[test]
    fn test_decode_known() {
        assert_eq!(CommandId::from_u8(0x50), Some(CommandId::Ls));
        assert_eq!(CommandId::from_u8(0x58), Some(CommandId::Write));
        assert_eq!(CommandId::from_u8(0x5E), Some(CommandId::SetTime));
    }

    #[test]
    fn test_decode_out_of_range() {
        assert_eq!(CommandId::from_u8(0x4F), None);
        assert_eq!(CommandId::from_u8(0x5F), None);
        assert_eq!(CommandId::from_u8(0x00), None);
        assert_eq!(CommandId::from_u8(0xFF), None);
        assert_eq!(
            CommandId::try_from(0x60),
            Err(PacketError::UnknownCommand(0x60))
        );
    }

    #[test]
    fn test_decode_bounded_by_count() {
        assert_eq!(COMMAND_COUNT, 15);
        let last = COMMAND_BASE + COMMAND_COUNT as u8 - 1;
        assert_eq!(CommandId::from_u8(last), Some(CommandId::SetTime));
        assert_eq!(CommandId::from_u8(last + 1), None);
    }
}
