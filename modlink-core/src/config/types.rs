//! Configuration type definitions
//!
//! Every field has a default matching the shipped module behaviour, so a
//! module with no config file on its store behaves exactly as before.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lowest accepted frame rate
pub const MIN_FPS: u8 = 1;

/// Highest accepted frame rate
pub const MAX_FPS: u8 = 60;

/// How `ls` handles a listing longer than one reply frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ListingMode {
    /// Send as many frames as needed (protocol revision 2)
    #[default]
    Split,
    /// Stop at the first full frame (protocol revision 1)
    Truncate,
}

/// How path payloads relate to the working directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PathResolution {
    /// Paths are used as sent; the working directory is informational
    #[default]
    Literal,
    /// Relative paths, and `ls`, resolve against the working directory
    RelativeToCwd,
}

/// Command protocol behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProtocolConfig {
    pub listing: ListingMode,
    pub paths: PathResolution,
    /// Reject `write` packets whose id does not follow the previous one
    pub enforce_sequence: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            listing: ListingMode::Split,
            paths: PathResolution::Literal,
            enforce_sequence: true,
        }
    }
}

/// Display playback settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayConfig {
    /// Animation frame rate
    pub fps: u8,
}

impl DisplayConfig {
    /// Frame timer period in milliseconds
    pub fn frame_interval_ms(&self) -> u32 {
        1000 / self.fps.clamp(MIN_FPS, MAX_FPS) as u32
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { fps: 12 }
    }
}

/// Complete module configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModuleConfig {
    pub protocol: ProtocolConfig,
    pub display: DisplayConfig,
}
