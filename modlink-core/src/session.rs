//! Open-file write session
//!
//! Created by `open`, fed by `write`, consumed by `close`. Holds the
//! append handle, the chunk buffer in front of it and the packet sequence
//! baseline.

use modlink_hal::FileStore;

use crate::chunk::{ChunkBuffer, CHUNK_SIZE};
use crate::error::CommandError;

/// The single outstanding write handle
pub struct WriteSession<F, const C: usize = CHUNK_SIZE> {
    file: F,
    chunk: ChunkBuffer<C>,
    last_packet_id: Option<u32>,
}

impl<F, const C: usize> WriteSession<F, C> {
    pub fn new(file: F) -> Self {
        Self {
            file,
            chunk: ChunkBuffer::new(),
            last_packet_id: None,
        }
    }

    /// Buffer `data`, committing every completed chunk
    ///
    /// With `enforce_sequence`, the first write sets the baseline and each
    /// later write must carry the next packet id. An out-of-sequence write
    /// is rejected without touching the buffer.
    pub fn write<S>(
        &mut self,
        store: &mut S,
        packet_id: u32,
        data: &[u8],
        enforce_sequence: bool,
    ) -> Result<(), CommandError>
    where
        S: FileStore<File = F> + ?Sized,
    {
        if enforce_sequence {
            if let Some(last) = self.last_packet_id {
                let expected = last.wrapping_add(1);
                if packet_id != expected {
                    return Err(CommandError::Sequence {
                        expected,
                        received: packet_id,
                    });
                }
            }
        }
        self.last_packet_id = Some(packet_id);

        let file = &mut self.file;
        self.chunk.accept(data, |chunk| {
            trace!("commit chunk of {=usize} bytes", C);
            commit(store, file, chunk)
        })
    }

    /// Flush the pending tail and close the handle
    ///
    /// The handle is closed even if the flush fails; the first error wins.
    pub fn close<S>(self, store: &mut S) -> Result<(), CommandError>
    where
        S: FileStore<File = F> + ?Sized,
    {
        let Self {
            mut file,
            mut chunk,
            ..
        } = self;

        let flushed = chunk.flush(|tail| commit(store, &mut file, tail));
        let closed = store.close(file).map_err(CommandError::from);
        flushed.and(closed)
    }

    /// Close without flushing, ignoring errors
    ///
    /// Used when the store is about to be formatted or the session failed.
    pub fn abandon<S>(self, store: &mut S)
    where
        S: FileStore<File = F> + ?Sized,
    {
        if let Err(e) = store.close(self.file) {
            warn!("abandoned write handle failed to close: {}", e);
        }
    }

    /// Bytes buffered but not yet committed
    pub fn pending(&self) -> usize {
        self.chunk.len()
    }

    /// Packet id of the last accepted write
    pub fn last_packet_id(&self) -> Option<u32> {
        self.last_packet_id
    }
}

/// Write all of `data` or report how much the store took
fn commit<S>(store: &mut S, file: &mut S::File, data: &[u8]) -> Result<(), CommandError>
where
    S: FileStore + ?Sized,
{
    let written = store.write(file, data)?;
    if written != data.len() {
        return Err(CommandError::ShortWrite {
            written,
            expected: data.len(),
        });
    }
    Ok(())
}
