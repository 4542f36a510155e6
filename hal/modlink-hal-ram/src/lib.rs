//! RAM-backed file store
//!
//! Implements [`FileStore`] over an in-memory tree with the same observable
//! behaviour as the littlefs store on the module: `.`/`..` entries in
//! listings, metadata-pair block accounting, mount/format lifecycle, and
//! handles that go stale when the store is reformatted.
//!
//! Host builds and the core's tests use this store. It also counts reads per
//! path and can inject read faults, which lets tests observe exactly which
//! files the animation loader touches.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use modlink_hal::flash;
use modlink_hal::{
    DirEntry, EntryKind, FileStore, Metadata, OpenFlags, SeekFrom, StorageError, NAME_MAX,
};

/// Default block size (RP2040 flash sector)
pub const BLOCK_SIZE: u32 = 4096;

/// Default block count (512 KiB store)
pub const BLOCK_COUNT: u32 = 128;

/// Blocks taken by every directory's metadata pair, the root included
const DIR_BLOCKS: u32 = 2;

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// Open file handle
#[derive(Debug)]
pub struct RamFile {
    path: String,
    pos: u32,
    flags: OpenFlags,
    generation: u32,
}

impl RamFile {
    /// Normalized path this handle refers to
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Open directory handle
///
/// Entries are captured when the directory is opened.
#[derive(Debug)]
pub struct RamDir {
    entries: Vec<DirEntry>,
    next: usize,
    generation: u32,
}

/// In-memory file store
#[derive(Debug)]
pub struct RamStore {
    nodes: BTreeMap<String, Node>,
    /// A filesystem has been written (format succeeded at least once)
    formatted: bool,
    mounted: bool,
    generation: u32,
    block_size: u32,
    block_count: u32,
    reads: BTreeMap<String, usize>,
    stale_accesses: usize,
    read_fault: Option<String>,
}

impl Default for RamStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RamStore {
    /// Create a blank store with the default geometry
    ///
    /// A blank store has never been formatted, so `mount` fails until
    /// `format` runs (see [`modlink_hal::mount_or_format`]).
    pub fn new() -> Self {
        Self::with_geometry(BLOCK_SIZE, BLOCK_COUNT)
    }

    /// Create a blank store with a custom geometry
    pub fn with_geometry(block_size: u32, block_count: u32) -> Self {
        Self {
            nodes: BTreeMap::new(),
            formatted: false,
            mounted: false,
            generation: 0,
            block_size: block_size.max(1),
            block_count,
            reads: BTreeMap::new(),
            stale_accesses: 0,
            read_fault: None,
        }
    }

    /// Create a formatted and mounted store with the default geometry
    pub fn mounted() -> Self {
        let mut store = Self::new();
        store.formatted = true;
        store.mounted = true;
        store.nodes.insert(String::new(), Node::Dir);
        store
    }

    /// Number of successful or failed `read` calls against `path`
    pub fn reads_of(&self, path: &str) -> usize {
        match normalize(path) {
            Ok(key) => self.reads.get(&key).copied().unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// Number of operations attempted on handles invalidated by `format`
    pub fn stale_accesses(&self) -> usize {
        self.stale_accesses
    }

    /// Make every read of `path` fail with [`StorageError::Io`]
    ///
    /// Pass `None` to clear the fault.
    pub fn set_read_fault(&mut self, path: Option<&str>) {
        self.read_fault = path.and_then(|p| normalize(p).ok());
    }

    /// Contents of a file, bypassing handles
    pub fn contents(&self, path: &str) -> Option<&[u8]> {
        let key = normalize(path).ok()?;
        match self.nodes.get(&key)? {
            Node::File(data) => Some(data),
            Node::Dir => None,
        }
    }

    /// Whether the store is currently mounted
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn ensure_mounted(&self) -> Result<(), StorageError> {
        if self.mounted {
            Ok(())
        } else {
            Err(StorageError::NotMounted)
        }
    }

    fn check_handle(&mut self, generation: u32) -> Result<(), StorageError> {
        self.ensure_mounted()?;
        if generation != self.generation {
            self.stale_accesses += 1;
            return Err(StorageError::BadHandle);
        }
        Ok(())
    }

    fn ensure_parent_dir(&self, key: &str) -> Result<(), StorageError> {
        match self.nodes.get(parent_of(key)) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(StorageError::NotDir),
            None => Err(StorageError::NotFound),
        }
    }

    fn blocks_for(&self, len: usize) -> u32 {
        let len = len as u32;
        len.div_ceil(self.block_size)
    }

    fn used(&self) -> u32 {
        self.nodes
            .values()
            .map(|node| match node {
                Node::Dir => DIR_BLOCKS,
                Node::File(data) => self.blocks_for(data.len()),
            })
            .sum()
    }

    fn free(&self) -> u32 {
        self.block_count.saturating_sub(self.used())
    }
}

impl FileStore for RamStore {
    type File = RamFile;
    type Dir = RamDir;

    fn open(&mut self, path: &str, flags: OpenFlags) -> Result<RamFile, StorageError> {
        self.ensure_mounted()?;
        if !flags.readable() && !flags.writable() {
            return Err(StorageError::Invalid);
        }
        let key = normalize(path)?;

        match self.nodes.get_mut(&key) {
            Some(Node::Dir) => return Err(StorageError::IsDir),
            Some(Node::File(data)) => {
                if flags.contains(OpenFlags::CREATE | OpenFlags::EXCL) {
                    return Err(StorageError::Exists);
                }
                if flags.contains(OpenFlags::TRUNCATE) && flags.writable() {
                    flash::exclusive(|| data.clear());
                }
            }
            None => {
                if !flags.contains(OpenFlags::CREATE) || !flags.writable() {
                    return Err(StorageError::NotFound);
                }
                self.ensure_parent_dir(&key)?;
                if self.free() == 0 {
                    return Err(StorageError::NoSpace);
                }
                let nodes = &mut self.nodes;
                flash::exclusive(|| nodes.insert(key.clone(), Node::File(Vec::new())));
            }
        }

        Ok(RamFile {
            path: key,
            pos: 0,
            flags,
            generation: self.generation,
        })
    }

    fn close(&mut self, file: RamFile) -> Result<(), StorageError> {
        self.check_handle(file.generation)
    }

    fn read(&mut self, file: &mut RamFile, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.check_handle(file.generation)?;
        *self.reads.entry(file.path.clone()).or_insert(0) += 1;
        if !file.flags.readable() {
            return Err(StorageError::BadHandle);
        }
        if self.read_fault.as_deref() == Some(file.path.as_str()) {
            return Err(StorageError::Io);
        }

        let data = match self.nodes.get(&file.path) {
            Some(Node::File(data)) => data,
            Some(Node::Dir) => return Err(StorageError::IsDir),
            None => return Err(StorageError::NotFound),
        };

        let start = (file.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        file.pos += n as u32;
        Ok(n)
    }

    fn write(&mut self, file: &mut RamFile, data: &[u8]) -> Result<usize, StorageError> {
        self.check_handle(file.generation)?;
        if !file.flags.writable() {
            return Err(StorageError::BadHandle);
        }

        let current_len = match self.nodes.get(&file.path) {
            Some(Node::File(existing)) => existing.len(),
            Some(Node::Dir) => return Err(StorageError::IsDir),
            None => return Err(StorageError::NotFound),
        };

        let start = if file.flags.contains(OpenFlags::APPEND) {
            current_len
        } else {
            file.pos as usize
        };
        let end = start + data.len();
        let new_len = end.max(current_len);

        let grow = self
            .blocks_for(new_len)
            .saturating_sub(self.blocks_for(current_len));
        if grow > self.free() {
            return Err(StorageError::NoSpace);
        }

        if let Some(Node::File(existing)) = self.nodes.get_mut(&file.path) {
            flash::exclusive(|| {
                if existing.len() < new_len {
                    existing.resize(new_len, 0);
                }
                existing[start..end].copy_from_slice(data);
            });
        }
        file.pos = end as u32;
        Ok(data.len())
    }

    fn seek(&mut self, file: &mut RamFile, pos: SeekFrom) -> Result<u32, StorageError> {
        self.check_handle(file.generation)?;
        let len = match self.nodes.get(&file.path) {
            Some(Node::File(data)) => data.len() as i64,
            _ => return Err(StorageError::NotFound),
        };
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => file.pos as i64 + delta as i64,
            SeekFrom::End(delta) => len + delta as i64,
        };
        if target < 0 || target > u32::MAX as i64 {
            return Err(StorageError::Invalid);
        }
        file.pos = target as u32;
        Ok(file.pos)
    }

    fn stat(&mut self, path: &str) -> Result<Metadata, StorageError> {
        self.ensure_mounted()?;
        let key = normalize(path)?;
        match self.nodes.get(&key) {
            Some(Node::Dir) => Ok(Metadata {
                kind: EntryKind::Dir,
                size: 0,
            }),
            Some(Node::File(data)) => Ok(Metadata {
                kind: EntryKind::File,
                size: data.len() as u32,
            }),
            None => Err(StorageError::NotFound),
        }
    }

    fn open_dir(&mut self, path: &str) -> Result<RamDir, StorageError> {
        self.ensure_mounted()?;
        let key = normalize(path)?;
        match self.nodes.get(&key) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => return Err(StorageError::NotDir),
            None => return Err(StorageError::NotFound),
        }

        let mut entries = Vec::new();
        entries.push(entry(".", EntryKind::Dir, 0)?);
        entries.push(entry("..", EntryKind::Dir, 0)?);
        for (child, node) in self.nodes.iter() {
            if child.is_empty() || parent_of(child) != key.as_str() {
                continue;
            }
            let name = child.rsplit('/').next().unwrap_or(child);
            let (kind, size) = match node {
                Node::Dir => (EntryKind::Dir, 0),
                Node::File(data) => (EntryKind::File, data.len() as u32),
            };
            entries.push(entry(name, kind, size)?);
        }

        Ok(RamDir {
            entries,
            next: 0,
            generation: self.generation,
        })
    }

    fn read_dir(&mut self, dir: &mut RamDir) -> Result<Option<DirEntry>, StorageError> {
        self.check_handle(dir.generation)?;
        let next = dir.entries.get(dir.next).cloned();
        if next.is_some() {
            dir.next += 1;
        }
        Ok(next)
    }

    fn close_dir(&mut self, dir: RamDir) -> Result<(), StorageError> {
        self.check_handle(dir.generation)
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        self.ensure_mounted()?;
        let key = normalize(path)?;
        if key.is_empty() {
            return Err(StorageError::Invalid);
        }
        match self.nodes.get(&key) {
            None => return Err(StorageError::NotFound),
            Some(Node::Dir) => {
                let has_children = self
                    .nodes
                    .keys()
                    .any(|child| !child.is_empty() && parent_of(child) == key.as_str());
                if has_children {
                    return Err(StorageError::NotEmpty);
                }
            }
            Some(Node::File(_)) => {}
        }
        let nodes = &mut self.nodes;
        flash::exclusive(|| nodes.remove(&key));
        Ok(())
    }

    fn mkdir(&mut self, path: &str) -> Result<(), StorageError> {
        self.ensure_mounted()?;
        let key = normalize(path)?;
        if self.nodes.contains_key(&key) {
            return Err(StorageError::Exists);
        }
        self.ensure_parent_dir(&key)?;
        if self.free() < DIR_BLOCKS {
            return Err(StorageError::NoSpace);
        }
        let nodes = &mut self.nodes;
        flash::exclusive(|| nodes.insert(key, Node::Dir));
        Ok(())
    }

    fn format(&mut self) -> Result<(), StorageError> {
        if self.block_count < DIR_BLOCKS {
            return Err(StorageError::NoSpace);
        }
        let nodes = &mut self.nodes;
        flash::exclusive(|| {
            nodes.clear();
            nodes.insert(String::new(), Node::Dir);
        });
        self.formatted = true;
        self.mounted = false;
        self.generation = self.generation.wrapping_add(1);
        Ok(())
    }

    fn mount(&mut self) -> Result<(), StorageError> {
        if !self.formatted {
            return Err(StorageError::Corrupt);
        }
        self.mounted = true;
        Ok(())
    }

    fn used_blocks(&mut self) -> Result<u32, StorageError> {
        self.ensure_mounted()?;
        Ok(self.used())
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn block_size(&self) -> u32 {
        self.block_size
    }
}

fn entry(name: &str, kind: EntryKind, size: u32) -> Result<DirEntry, StorageError> {
    let mut entry_name = heapless::String::new();
    entry_name
        .push_str(name)
        .map_err(|_| StorageError::NameTooLong)?;
    Ok(DirEntry {
        name: entry_name,
        kind,
        size,
    })
}

/// Normalize a path into a tree key: no leading slash, no `.`, `..` resolved
fn normalize(path: &str) -> Result<String, StorageError> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => {
                if name.len() > NAME_MAX {
                    return Err(StorageError::NameTooLong);
                }
                parts.push(name);
            }
        }
    }
    Ok(parts.join("/"))
}

fn parent_of(key: &str) -> &str {
    match key.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}
