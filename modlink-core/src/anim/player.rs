//! Double-buffered frame player
//!
//! Three contexts share one [`Player`]:
//!
//! - the command dispatcher starts and stops animations, shows static
//!   images and streams raw pixels
//! - the loader task ([`Player::run_loader`]) reads the next frame from the
//!   store into the back buffer
//! - the frame timer ([`Player::run_frame_timer`] or a hardware timer
//!   calling [`Player::on_frame_tick`]) presents the back buffer and swaps
//!
//! Lock order is store, then animation file, then frame buffer. The state
//! lock is a blocking mutex held only for in-memory updates, never across
//! an await. The timer never waits: it only `try_lock`s the buffer it is
//! about to present and skips the frame otherwise.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embedded_hal_async::delay::DelayNs;
use modlink_hal::{
    DisplayError, EntryKind, FileStore, FrameSink, OpenFlags, SeekFrom, StorageError,
};

use super::state::{LoaderJob, Phase, PlaybackState};
use crate::error::CommandError;

/// Result of one frame timer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// No animation running
    Idle,
    /// Next frame not loaded yet; the previous frame stays on screen
    Skipped,
    /// Frame presented
    Presented { frame: u32 },
}

/// Animation engine with its frame buffer pair
///
/// `N` is the size of one frame in bytes.
pub struct Player<M: RawMutex, F, D, const N: usize> {
    state: BlockingMutex<M, RefCell<PlaybackState>>,
    buffers: [Mutex<M, [u8; N]>; 2],
    file: Mutex<M, Option<F>>,
    display: BlockingMutex<M, RefCell<D>>,
    /// Raised by `start`, consumed by the loader
    start: Signal<M, ()>,
    /// Raised by the loader when it leaves a session
    stopped: Signal<M, ()>,
}

impl<M: RawMutex, F, D: FrameSink, const N: usize> Player<M, F, D, N> {
    pub const fn new(display: D) -> Self {
        Self {
            state: BlockingMutex::new(RefCell::new(PlaybackState::new())),
            buffers: [Mutex::new([0; N]), Mutex::new([0; N])],
            file: Mutex::new(None),
            display: BlockingMutex::new(RefCell::new(display)),
            start: Signal::new(),
            stopped: Signal::new(),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PlaybackState) -> R) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Run `f` with exclusive access to the display
    pub fn with_display<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        self.display.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn is_playing(&self) -> bool {
        self.with_state(|s| s.playing)
    }

    pub fn phase(&self) -> Phase {
        self.with_state(|s| s.phase())
    }

    /// Frames in the running animation (0 when idle)
    pub fn frame_count(&self) -> u32 {
        self.with_state(|s| if s.playing { s.frame_count } else { 0 })
    }

    /// Start playing the animation at `path`
    ///
    /// Any running animation is torn down first. The frame count is the
    /// file size divided by the frame size, rounded down; a file shorter
    /// than one frame is rejected. Returns the frame count.
    pub async fn start<S>(&self, storage: &Mutex<M, S>, path: &str) -> Result<u32, CommandError>
    where
        S: FileStore<File = F>,
    {
        self.stop(storage).await;

        let mut store = storage.lock().await;
        let meta = store.stat(path)?;
        if meta.kind != EntryKind::File {
            return Err(StorageError::IsDir.into());
        }
        let frame_count = meta.size / N as u32;
        if frame_count == 0 {
            return Err(CommandError::InvalidAsset);
        }

        let file = store.open(path, OpenFlags::READ)?;
        if let Some(stale) = self.file.lock().await.replace(file) {
            if let Err(e) = store.close(stale) {
                warn!("closing stale animation file failed: {}", e);
            }
        }
        drop(store);

        self.stopped.reset();
        self.with_state(|s| s.begin(frame_count));
        self.start.signal(());

        info!("animation started: {=u32} frames", frame_count);
        Ok(frame_count)
    }

    /// Tear down the running animation
    ///
    /// Waits for the loader to acknowledge before closing the file and
    /// releasing the displayed object, so the loader task must be running
    /// whenever an animation is. Returns true if an animation was running.
    pub async fn stop<S>(&self, storage: &Mutex<M, S>) -> bool
    where
        S: FileStore<File = F>,
    {
        let (was_playing, mut loader_active) = self.with_state(|s| s.request_stop());

        while loader_active {
            self.stopped.wait().await;
            loader_active = self.with_state(|s| s.loader_active);
        }

        let file = self.file.lock().await.take();
        if let Some(file) = file {
            if let Err(e) = storage.lock().await.close(file) {
                warn!("closing animation file failed: {}", e);
            }
        }

        if was_playing {
            self.with_display(|d| d.release());
            info!("animation stopped");
        }
        was_playing
    }

    /// Present the first frame of `path` once
    ///
    /// A short file is zero filled to a full frame. An empty one is
    /// rejected.
    pub async fn show_static<S>(
        &self,
        storage: &Mutex<M, S>,
        path: &str,
    ) -> Result<(), CommandError>
    where
        S: FileStore<File = F>,
    {
        self.stop(storage).await;

        let mut store = storage.lock().await;
        let mut file = store.open(path, OpenFlags::READ)?;
        let mut buffer = self.buffers[0].lock().await;

        let read = read_full(&mut *store, &mut file, &mut buffer[..]);
        let closed = store.close(file);
        let len = read?;
        closed?;
        drop(store);

        if len == 0 {
            return Err(CommandError::InvalidAsset);
        }
        buffer[len..].fill(0);

        self.with_display(|d| d.present(&buffer[..]))?;
        debug!("static image shown ({=usize} bytes)", len);
        Ok(())
    }

    /// Copy raw pixel bytes into the primary buffer at `cursor`
    ///
    /// When the buffer fills it is presented and `cursor` restarts at 0.
    /// Bytes past the end of the frame are dropped and reported as
    /// [`CommandError::DisplayOverflow`]; the frame is still presented.
    /// The caller must have stopped any animation.
    pub async fn write_raw(&self, cursor: &mut usize, data: &[u8]) -> Result<(), CommandError> {
        let mut buffer = self.buffers[0].lock().await;

        let start = (*cursor).min(N);
        let take = data.len().min(N - start);
        buffer[start..start + take].copy_from_slice(&data[..take]);
        *cursor = start + take;

        if *cursor == N {
            *cursor = 0;
            self.with_display(|d| d.present(&buffer[..]))?;
            trace!("raw frame presented");
        }

        if take < data.len() {
            return Err(CommandError::DisplayOverflow);
        }
        Ok(())
    }

    /// Frame timer body
    ///
    /// Never blocks: if the back buffer is not ready, or is still being
    /// written, the tick is skipped.
    pub fn on_frame_tick(&self) -> TickOutcome {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            if !state.playing {
                return TickOutcome::Idle;
            }
            let Some(index) = state.ready_buffer() else {
                trace!("frame skipped: not loaded");
                return TickOutcome::Skipped;
            };
            let Ok(buffer) = self.buffers[index].try_lock() else {
                trace!("frame skipped: buffer busy");
                return TickOutcome::Skipped;
            };

            let presented: Result<(), DisplayError> =
                self.display.lock(|d| d.borrow_mut().present(&buffer[..]));
            if let Err(e) = presented {
                warn!("frame present failed: {}", e);
                return TickOutcome::Skipped;
            }

            TickOutcome::Presented {
                frame: state.swap_buffers(),
            }
        })
    }

    /// Frame timer task
    pub async fn run_frame_timer(&self, delay: &mut impl DelayNs, interval_ms: u32) {
        loop {
            delay.delay_ms(interval_ms).await;
            self.on_frame_tick();
        }
    }

    /// Background loader task
    ///
    /// Sleeps until an animation starts, keeps the back buffer filled while
    /// it plays, and acknowledges every stop. `poll_ms` bounds how often it
    /// checks for a consumed buffer.
    pub async fn run_loader<S>(
        &self,
        storage: &Mutex<M, S>,
        delay: &mut impl DelayNs,
        poll_ms: u32,
    ) where
        S: FileStore<File = F>,
    {
        loop {
            self.start.wait().await;
            self.serve(storage, delay, poll_ms).await;
            self.stopped.signal(());
        }
    }

    /// Run one animation session until a stop is requested
    async fn serve<S>(&self, storage: &Mutex<M, S>, delay: &mut impl DelayNs, poll_ms: u32)
    where
        S: FileStore<File = F>,
    {
        loop {
            match self.with_state(|s| s.next_job()) {
                LoaderJob::Exit => return,
                LoaderJob::Wait => delay.delay_ms(poll_ms).await,
                LoaderJob::Load {
                    frame,
                    buffer,
                    session,
                } => {
                    let ok = self.load_frame(storage, frame, buffer).await;
                    self.with_state(|s| s.publish(session, ok));
                    if !ok {
                        // Back off; a persistent fault leaves the animation frozen
                        delay.delay_ms(poll_ms).await;
                    }
                }
            }
        }
    }

    /// Read `frame` into buffer `index`; true on a complete frame
    async fn load_frame<S>(&self, storage: &Mutex<M, S>, frame: u32, index: usize) -> bool
    where
        S: FileStore<File = F>,
    {
        let mut store = storage.lock().await;
        let mut file = self.file.lock().await;
        let Some(file) = file.as_mut() else {
            return false;
        };
        let mut buffer = self.buffers[index].lock().await;

        let offset = frame.saturating_mul(N as u32);
        let result = store
            .seek(file, SeekFrom::Start(offset))
            .and_then(|_| read_full(&mut *store, file, &mut buffer[..]));

        match result {
            Ok(len) if len == N => true,
            Ok(len) => {
                warn!("frame {=u32} short read: {=usize} bytes", frame, len);
                false
            }
            Err(e) => {
                warn!("frame {=u32} read failed: {}", frame, e);
                false
            }
        }
    }
}

/// Read until `buf` is full or the file ends
fn read_full<S: FileStore + ?Sized>(
    store: &mut S,
    file: &mut S::File,
    buf: &mut [u8],
) -> Result<usize, StorageError> {
    let mut len = 0;
    while len < buf.len() {
        match store.read(file, &mut buf[len..])? {
            0 => break,
            n => len += n,
        }
    }
    Ok(len)
}
