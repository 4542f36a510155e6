//! Animation playback
//!
//! An animation asset is a file of back-to-back raw frames. The
//! [`Player`] plays one at a time from a pair of frame buffers: the loader
//! fills the back buffer while the timer presents the front one.

pub mod player;
pub mod state;

pub use player::{Player, TickOutcome};
pub use state::{LoaderJob, Phase, PlaybackState};

/// Path suffix marking an animation asset
pub const ANIMATION_SUFFIX: &str = ".araw";

/// True if `path` names an animation asset
///
/// The name must have at least one character before the suffix.
pub fn is_animation(path: &str) -> bool {
    path.len() > ANIMATION_SUFFIX.len() && path.ends_with(ANIMATION_SUFFIX)
}
