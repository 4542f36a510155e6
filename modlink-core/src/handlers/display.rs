//! Display and clock commands

use embassy_sync::blocking_mutex::raw::RawMutex;
use modlink_hal::{FileStore, FrameSink};

use crate::anim;
use crate::error::{CommandError, ValidationError};
use crate::module::{Module, TimeOfDay};

impl<'a, M, S, D, const FRAME: usize, const CHUNK: usize> Module<'a, M, S, D, FRAME, CHUNK>
where
    M: RawMutex,
    S: FileStore,
    D: FrameSink,
{
    /// Show an image or start an animation
    ///
    /// Paths ending in `.araw` play as animations; anything else is shown
    /// as a single static frame. Whatever was on screen is torn down first.
    pub(crate) async fn choose_image(&mut self, payload: &[u8]) -> Result<(), CommandError> {
        let path = self.path_arg(payload)?;

        // Both paths reuse the primary frame buffer
        self.display_cursor = 0;

        if anim::is_animation(&path) {
            self.player.start(self.storage, &path).await?;
        } else {
            self.player.show_static(self.storage, &path).await?;
        }
        Ok(())
    }

    /// Stream raw pixel bytes to the display
    pub(crate) async fn write_display(&mut self, payload: &[u8]) -> Result<(), CommandError> {
        if payload.is_empty() {
            return Err(ValidationError::InsufficientData.into());
        }
        if self.player.is_playing() {
            self.player.stop(self.storage).await;
        }
        self.player.write_raw(&mut self.display_cursor, payload).await
    }

    /// Set the wall clock from `[hour, minute, second]`
    pub(crate) fn set_time(&mut self, payload: &[u8]) -> Result<(), CommandError> {
        let [hour, minute, second] = match payload.get(..3) {
            Some(&[hour, minute, second]) => [hour, minute, second],
            _ => return Err(ValidationError::InsufficientData.into()),
        };
        if hour > 23 || minute > 59 || second > 59 {
            return Err(ValidationError::OutOfRange.into());
        }

        self.clock = Some(TimeOfDay {
            hour,
            minute,
            second,
        });
        info!("time set to {=u8}:{=u8}:{=u8}", hour, minute, second);
        Ok(())
    }
}
