//! File store commands
//!
//! ls, cd, pwd, rm, mkdir, touch, cat, open, write, close, format and
//! flash_remaining. Path arguments are validated before the store is
//! touched.

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::String;
use modlink_hal::{DirEntry, EntryKind, FileStore, FrameSink, OpenFlags};
use modlink_protocol::{Reply, ReplySink, Status, REPLY_PAYLOAD_SIZE};

use super::Outbox;
use crate::config::{ListingMode, PathResolution};
use crate::error::{CommandError, ValidationError};
use crate::module::Module;
use crate::path::{self, PathBuf, DIRECTORY_MAX, MAX_PATH_LEN};
use crate::session::WriteSession;

/// Data bytes per `cat` frame (one byte is the length prefix)
pub const CAT_CHUNK: usize = REPLY_PAYLOAD_SIZE - 1;

impl<'a, M, S, D, const FRAME: usize, const CHUNK: usize> Module<'a, M, S, D, FRAME, CHUNK>
where
    M: RawMutex,
    S: FileStore,
    D: FrameSink,
{
    /// Validate a path payload and apply the configured resolution
    pub(crate) fn path_arg(&self, payload: &[u8]) -> Result<PathBuf, ValidationError> {
        let raw = path::extract(payload, MAX_PATH_LEN)?;
        match self.config.protocol.paths {
            PathResolution::Literal => {
                PathBuf::try_from(raw).map_err(|_| ValidationError::PathTooLong)
            }
            PathResolution::RelativeToCwd => path::resolve(&self.cwd, raw),
        }
    }

    /// List a directory
    ///
    /// Each entry is `name` followed by `/` (directory) or a space (file)
    /// and a newline. In split mode full frames are sent as they fill and
    /// the final status frame carries no entries; in truncate mode the
    /// listing stops at the first entry that does not fit the single reply.
    pub(crate) async fn ls<T: ReplySink>(
        &mut self,
        reply: &mut Reply,
        out: &mut Outbox<'_, T>,
    ) -> Result<(), CommandError> {
        let mode = self.config.protocol.listing;
        let target = match self.config.protocol.paths {
            PathResolution::Literal => "/",
            PathResolution::RelativeToCwd => self.cwd.as_str(),
        };

        let mut store = self.storage.lock().await;
        let mut dir = store.open_dir(target)?;
        let listed = list_dir(&mut *store, &mut dir, mode, reply, out).await;
        let closed = store.close_dir(dir);
        drop(store);
        listed?;
        closed?;

        if mode == ListingMode::Split && !reply.is_empty() {
            out.send(reply).await?;
            reply.clear_payload();
        }
        Ok(())
    }

    /// Change the working directory
    ///
    /// The target must exist and be a directory.
    pub(crate) async fn cd(&mut self, payload: &[u8]) -> Result<(), CommandError> {
        let raw = path::extract(payload, DIRECTORY_MAX)?;
        let resolved;
        let target = match self.config.protocol.paths {
            PathResolution::Literal => raw,
            PathResolution::RelativeToCwd => {
                resolved = path::resolve(&self.cwd, raw)?;
                resolved.as_str()
            }
        };
        if target.len() >= DIRECTORY_MAX {
            return Err(ValidationError::PathTooLong.into());
        }
        let target: String<DIRECTORY_MAX> =
            String::try_from(target).map_err(|_| ValidationError::PathTooLong)?;

        let mut store = self.storage.lock().await;
        let dir = store.open_dir(&target)?;
        store.close_dir(dir)?;

        debug!("cwd is now {=str}", target.as_str());
        self.cwd = target;
        Ok(())
    }

    /// Report the working directory, truncated to one frame
    pub(crate) fn pwd(&mut self, reply: &mut Reply) -> Result<(), CommandError> {
        let cwd = self.cwd.as_bytes();
        let len = cwd.len().min(reply.remaining());
        reply.extend_from_slice(&cwd[..len])?;
        Ok(())
    }

    pub(crate) async fn rm(&mut self, payload: &[u8]) -> Result<(), CommandError> {
        let path = self.path_arg(payload)?;
        self.storage.lock().await.remove(&path)?;
        Ok(())
    }

    pub(crate) async fn mkdir(&mut self, payload: &[u8]) -> Result<(), CommandError> {
        let path = self.path_arg(payload)?;
        self.storage.lock().await.mkdir(&path)?;
        Ok(())
    }

    /// Create an empty file; an existing file is left untouched
    pub(crate) async fn touch(&mut self, payload: &[u8]) -> Result<(), CommandError> {
        let path = self.path_arg(payload)?;
        let mut store = self.storage.lock().await;
        let file = store.open(&path, OpenFlags::WRITE | OpenFlags::CREATE)?;
        store.close(file)?;
        Ok(())
    }

    /// Stream a file
    ///
    /// Each data frame carries `[n][n bytes]`; the final status frame has
    /// `n = 0`. A missing file produces only the final frame.
    pub(crate) async fn cat<T: ReplySink>(
        &mut self,
        payload: &[u8],
        out: &mut Outbox<'_, T>,
    ) -> Result<(), CommandError> {
        let path = self.path_arg(payload)?;
        let mut store = self.storage.lock().await;
        let mut file = store.open(&path, OpenFlags::READ)?;

        let streamed = stream_file(&mut *store, &mut file, out).await;
        let closed = store.close(file);
        streamed?;
        closed?;
        Ok(())
    }

    /// Open a file for appending, creating it if needed
    pub(crate) async fn open(&mut self, payload: &[u8]) -> Result<(), CommandError> {
        let path = self.path_arg(payload)?;
        if self.session.is_some() {
            return Err(CommandError::AlreadyOpen);
        }

        let file = self
            .storage
            .lock()
            .await
            .open(&path, OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::APPEND)?;
        self.session = Some(WriteSession::new(file));
        debug!("opened {=str} for writing", path.as_str());
        Ok(())
    }

    /// Append to the open file
    ///
    /// A store failure closes the handle; a sequence error keeps it.
    pub(crate) async fn write(
        &mut self,
        packet_id: u32,
        payload: &[u8],
    ) -> Result<(), CommandError> {
        if payload.is_empty() {
            return Err(ValidationError::InsufficientData.into());
        }
        let enforce = self.config.protocol.enforce_sequence;
        let Some(session) = self.session.as_mut() else {
            return Err(CommandError::NotOpen);
        };

        let mut store = self.storage.lock().await;
        let result = session.write(&mut *store, packet_id, payload, enforce);
        if let Err(e) = &result {
            if e.is_storage() {
                if let Some(session) = self.session.take() {
                    session.abandon(&mut *store);
                }
            }
        }
        result
    }

    /// Flush and close the open file
    pub(crate) async fn close(&mut self) -> Result<(), CommandError> {
        let session = self.session.take().ok_or(CommandError::NotOpen)?;
        let mut store = self.storage.lock().await;
        session.close(&mut *store)
    }

    /// Erase the whole store
    ///
    /// Stops any animation and drops the write handle first; the working
    /// directory returns to the root.
    pub(crate) async fn format(&mut self) -> Result<(), CommandError> {
        self.player.stop(self.storage).await;

        let mut store = self.storage.lock().await;
        if let Some(session) = self.session.take() {
            session.abandon(&mut *store);
        }
        self.cwd.clear();
        let _ = self.cwd.push('/');
        self.display_cursor = 0;

        store.format()?;
        store.mount()?;
        info!("store formatted");
        Ok(())
    }

    /// Report free blocks and the block size
    pub(crate) async fn flash_remaining(&mut self, reply: &mut Reply) -> Result<(), CommandError> {
        let mut store = self.storage.lock().await;
        let used = store.used_blocks()?;
        let remaining = store.block_count().saturating_sub(used);
        let block_size = store.block_size();
        drop(store);

        reply.set_status(Status::FlashRemaining);
        reply.extend_from_slice(&remaining.to_le_bytes())?;
        reply.extend_from_slice(&block_size.to_le_bytes())?;
        Ok(())
    }
}

/// Append every entry of `dir` except `.` and `..`
async fn list_dir<S: FileStore + ?Sized, T: ReplySink>(
    store: &mut S,
    dir: &mut S::Dir,
    mode: ListingMode,
    reply: &mut Reply,
    out: &mut Outbox<'_, T>,
) -> Result<(), CommandError> {
    while let Some(entry) = store.read_dir(dir)? {
        if entry.is_dot() {
            continue;
        }
        if !append_entry(&entry, mode, reply, out).await? {
            debug!("listing truncated");
            break;
        }
    }
    Ok(())
}

/// Send `file` as length-prefixed data frames
async fn stream_file<S: FileStore + ?Sized, T: ReplySink>(
    store: &mut S,
    file: &mut S::File,
    out: &mut Outbox<'_, T>,
) -> Result<(), CommandError> {
    let mut chunk = [0u8; CAT_CHUNK];
    loop {
        let n = store.read(file, &mut chunk)?;
        if n == 0 {
            return Ok(());
        }
        let mut frame = Reply::new(Status::Success);
        frame.push(n as u8)?;
        frame.extend_from_slice(&chunk[..n])?;
        out.send(&frame).await?;
    }
}

/// Append one listing entry to `reply`
///
/// Returns false if the listing must stop (truncate mode, no room).
async fn append_entry<T: ReplySink>(
    entry: &DirEntry,
    mode: ListingMode,
    reply: &mut Reply,
    out: &mut Outbox<'_, T>,
) -> Result<bool, CommandError> {
    let marker = match entry.kind {
        EntryKind::Dir => b'/',
        EntryKind::File => b' ',
    };
    let len = entry.name.len() + 2;

    if len > reply.remaining() {
        match mode {
            ListingMode::Truncate => return Ok(false),
            ListingMode::Split if !reply.is_empty() => {
                out.send(reply).await?;
                reply.clear_payload();
            }
            ListingMode::Split => {}
        }
    }

    // Only names longer than a whole frame spill over here
    for &byte in entry.name.as_bytes().iter().chain(&[marker, b'\n']) {
        if reply.push(byte).is_err() {
            out.send(reply).await?;
            reply.clear_payload();
            reply.push(byte)?;
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    struct NullSink;

    impl ReplySink for NullSink {
        type Error = ();

        async fn send(&mut self, _reply: &Reply) -> Result<(), ()> {
            Ok(())
        }
    }

    fn entry(name: &str, kind: EntryKind) -> DirEntry {
        DirEntry {
            name: String::try_from(name).unwrap(),
            kind,
            size: 0,
        }
    }

    #[test]
    fn test_entry_format() {
        let mut sink = NullSink;
        let mut out = Outbox::new(&mut sink);
        let mut reply = Reply::new(Status::Success);
        block_on(async {
            for (name, kind) in [("img", EntryKind::Dir), ("a.txt", EntryKind::File)] {
                append_entry(&entry(name, kind), ListingMode::Split, &mut reply, &mut out)
                    .await
                    .unwrap();
            }
        });
        assert_eq!(reply.payload(), b"img/\na.txt \n");
    }

    #[test]
    fn test_truncate_stops() {
        let mut sink = NullSink;
        let mut out = Outbox::new(&mut sink);
        let mut reply = Reply::new(Status::Success);
        let fits = block_on(append_entry(
            &entry(&"x".repeat(REPLY_PAYLOAD_SIZE - 1), EntryKind::File),
            ListingMode::Truncate,
            &mut reply,
            &mut out,
        ));
        assert_eq!(fits, Ok(false));
        assert!(reply.is_empty());
    }

    #[test]
    fn test_long_name_spills_across_frames() {
        struct Collect(Vec<Vec<u8>>);

        impl ReplySink for Collect {
            type Error = ();

            async fn send(&mut self, reply: &Reply) -> Result<(), ()> {
                self.0.push(reply.payload().to_vec());
                Ok(())
            }
        }

        let mut sink = Collect(Vec::new());
        let mut reply = Reply::new(Status::Success);
        let name = "n".repeat(40);
        {
            let mut out = Outbox::new(&mut sink);
            block_on(append_entry(
                &entry(&name, EntryKind::File),
                ListingMode::Split,
                &mut reply,
                &mut out,
            ))
            .unwrap();
        }
        assert_eq!(sink.0.len(), 1);
        assert_eq!(sink.0[0], vec![b'n'; REPLY_PAYLOAD_SIZE]);
        assert_eq!(reply.payload(), b"nnnnnnnnn \n");
    }
}
