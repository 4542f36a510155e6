//! Dispatcher context
//!
//! [`Module`] owns everything the command stream mutates between packets:
//! the working directory, the open write session, the raw display cursor
//! and the clock. The store and the player are shared with the animation
//! tasks and borrowed here.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use heapless::String;
use modlink_hal::{FileStore, FrameSink, FRAME_SIZE};
use modlink_protocol::{CommandId, Packet, Reply, ReplySink, Status};

use crate::anim::Player;
use crate::chunk::CHUNK_SIZE;
use crate::config::ModuleConfig;
use crate::error::CommandError;
use crate::handlers::Outbox;
use crate::path::DIRECTORY_MAX;
use crate::session::WriteSession;

/// The file store, shared between the dispatcher and the frame loader
pub type SharedStore<M, S> = Mutex<M, S>;

/// Wall clock time set by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Command dispatcher and its cross-packet state
///
/// `FRAME` is the display frame size in bytes, `CHUNK` the store write
/// granularity.
pub struct Module<
    'a,
    M: RawMutex,
    S: FileStore,
    D: FrameSink,
    const FRAME: usize = FRAME_SIZE,
    const CHUNK: usize = CHUNK_SIZE,
> {
    pub(crate) storage: &'a SharedStore<M, S>,
    pub(crate) player: &'a Player<M, S::File, D, FRAME>,
    pub(crate) config: ModuleConfig,
    pub(crate) cwd: String<DIRECTORY_MAX>,
    pub(crate) session: Option<WriteSession<S::File, CHUNK>>,
    /// Next byte of the primary frame buffer written by `write_display`
    pub(crate) display_cursor: usize,
    pub(crate) clock: Option<TimeOfDay>,
}

impl<'a, M, S, D, const FRAME: usize, const CHUNK: usize> Module<'a, M, S, D, FRAME, CHUNK>
where
    M: RawMutex,
    S: FileStore,
    D: FrameSink,
{
    pub fn new(
        storage: &'a SharedStore<M, S>,
        player: &'a Player<M, S::File, D, FRAME>,
        config: ModuleConfig,
    ) -> Self {
        let mut cwd = String::new();
        let _ = cwd.push('/');
        Self {
            storage,
            player,
            config,
            cwd,
            session: None,
            display_cursor: 0,
            clock: None,
        }
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Working directory
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Last time set by the host, if any
    pub fn time_of_day(&self) -> Option<TimeOfDay> {
        self.clock
    }

    /// True while a file is open for writing
    pub fn has_open_file(&self) -> bool {
        self.session.is_some()
    }

    /// Stop the running animation, if any
    pub async fn stop_animation(&mut self) -> bool {
        self.player.stop(self.storage).await
    }

    /// Handle one request frame
    ///
    /// Streaming commands send their data frames through `out` as they go;
    /// every request ends with exactly one final status frame. Returns the
    /// final status, or the transport error that interrupted the reply.
    pub async fn dispatch<T: ReplySink>(
        &mut self,
        frame: &[u8],
        out: &mut T,
    ) -> Result<Status, T::Error> {
        let packet = match Packet::parse(frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("rejected packet: {}", e);
                let status = CommandError::from(e).status();
                out.send(&Reply::new(status)).await?;
                return Ok(status);
            }
        };
        trace!(
            "packet {} id={=u32} len={=usize}",
            packet.command,
            packet.packet_id,
            packet.payload.len()
        );

        let mut reply = Reply::new(Status::Success);
        let mut outbox = Outbox::new(out);
        let result = self.execute(&packet, &mut reply, &mut outbox).await;

        let out = outbox.finish()?;
        if let Err(e) = result {
            warn!("{} failed: {}", packet.command, e);
            reply.clear_payload();
            reply.set_status(e.status());
        }

        out.send(&reply).await?;
        Ok(reply.status().unwrap_or(Status::InvalidCommand))
    }

    async fn execute<T: ReplySink>(
        &mut self,
        packet: &Packet<'_>,
        reply: &mut Reply,
        out: &mut Outbox<'_, T>,
    ) -> Result<(), CommandError> {
        let payload = packet.payload;
        match packet.command {
            CommandId::Ls => self.ls(reply, out).await,
            CommandId::Cd => self.cd(payload).await,
            CommandId::Pwd => self.pwd(reply),
            CommandId::Rm => self.rm(payload).await,
            CommandId::Mkdir => self.mkdir(payload).await,
            CommandId::Touch => self.touch(payload).await,
            CommandId::Cat => self.cat(payload, out).await,
            CommandId::Open => self.open(payload).await,
            CommandId::Write => self.write(packet.packet_id, payload).await,
            CommandId::Close => self.close().await,
            CommandId::FormatFilesystem => self.format().await,
            CommandId::FlashRemaining => self.flash_remaining(reply).await,
            CommandId::ChooseImage => self.choose_image(payload).await,
            CommandId::WriteDisplay => self.write_display(payload).await,
            CommandId::SetTime => self.set_time(payload),
        }
    }
}
