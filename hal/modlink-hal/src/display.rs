//! Display presentation abstraction
//!
//! The core never rasterises anything itself. It fills frame buffers and
//! hands them to the compositor through [`FrameSink`].

/// Panel width in pixels
pub const FRAME_WIDTH: usize = 128;

/// Panel height in pixels
pub const FRAME_HEIGHT: usize = 128;

/// Bytes per pixel (16-bit colour)
pub const BYTES_PER_PIXEL: usize = 2;

/// Size of one raw frame in bytes
pub const FRAME_SIZE: usize = FRAME_WIDTH * FRAME_HEIGHT * BYTES_PER_PIXEL;

/// Errors from the display side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Compositor rejected or failed to accept the frame
    Submit,
    /// Frame length does not match the panel geometry
    Geometry,
    /// Display not initialized
    NotInitialized,
}

/// Frame presentation trait
///
/// Implementations own the on-screen image object. `present` is called from
/// the frame timer, so it must not block.
pub trait FrameSink {
    /// Submit a complete frame for presentation
    fn present(&mut self, frame: &[u8]) -> Result<(), DisplayError>;

    /// Release the displayed image object
    ///
    /// Called when an animation is torn down or the store is formatted.
    fn release(&mut self);
}

impl<T: FrameSink + ?Sized> FrameSink for &mut T {
    fn present(&mut self, frame: &[u8]) -> Result<(), DisplayError> {
        (**self).present(frame)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
