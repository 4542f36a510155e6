//! Chunked write buffer
//!
//! Packet payloads are at most 26 bytes, flash pages are 256. Writes are
//! gathered here and committed in whole chunks so each store write lines
//! up with a page; the partial tail is committed on close.

/// Bytes committed per store write
pub const CHUNK_SIZE: usize = 256;

/// Fixed-capacity accumulation buffer
///
/// Invariant: `len < N` between calls. A chunk is committed the moment it
/// fills, so a full buffer is never left pending.
#[derive(Debug)]
pub struct ChunkBuffer<const N: usize = CHUNK_SIZE> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> ChunkBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
        }
    }

    /// Append `data`, calling `commit` once per completed chunk
    ///
    /// Bytes after the last completed chunk stay pending. If `commit`
    /// fails the chunk it was given is discarded, the buffer is reset and
    /// the remaining input is not consumed.
    pub fn accept<E>(
        &mut self,
        mut data: &[u8],
        mut commit: impl FnMut(&[u8; N]) -> Result<(), E>,
    ) -> Result<(), E> {
        while self.len + data.len() >= N {
            let take = N - self.len;
            self.buf[self.len..].copy_from_slice(&data[..take]);
            data = &data[take..];
            self.len = 0;
            commit(&self.buf)?;
        }

        self.buf[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        Ok(())
    }

    /// Hand the pending tail to `commit` and reset
    ///
    /// Does nothing when nothing is pending.
    pub fn flush<E>(&mut self, commit: impl FnOnce(&[u8]) -> Result<(), E>) -> Result<(), E> {
        if self.len == 0 {
            return Ok(());
        }
        let len = core::mem::take(&mut self.len);
        commit(&self.buf[..len])
    }

    /// Bytes waiting for the next commit
    pub fn pending(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for ChunkBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
