//! File store abstraction
//!
//! A thin contract over a block-structured, littlefs-style file store.
//! Allocation, wear leveling and block-device access are the store's own
//! business; the command core only opens, reads, writes and lists.

use core::ops::BitOr;

use heapless::String;

/// Longest file name a directory entry can carry (littlefs `LFS_NAME_MAX`)
pub const NAME_MAX: usize = 255;

/// Errors from file store operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// No entry at that path
    NotFound,
    /// Entry already exists
    Exists,
    /// No free blocks left
    NoSpace,
    /// Directory is not empty
    NotEmpty,
    /// Path names a directory where a file was expected
    IsDir,
    /// Path component is not a directory
    NotDir,
    /// Name exceeds [`NAME_MAX`]
    NameTooLong,
    /// Handle is closed or belongs to another mount
    BadHandle,
    /// Invalid argument (flags, seek target, path syntax)
    Invalid,
    /// Block device I/O failure
    Io,
    /// On-flash structures are corrupted
    Corrupt,
    /// Store is not mounted
    NotMounted,
}

/// Kind of directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EntryKind {
    File,
    Dir,
}

/// Result of a `stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Metadata {
    pub kind: EntryKind,
    /// File size in bytes (0 for directories)
    pub size: u32,
}

/// One entry produced by [`FileStore::read_dir`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DirEntry {
    pub name: String<NAME_MAX>,
    pub kind: EntryKind,
    pub size: u32,
}

impl DirEntry {
    /// Returns true for the `.` and `..` pseudo-entries
    pub fn is_dot(&self) -> bool {
        matches!(self.name.as_str(), "." | "..")
    }
}

/// Seek origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SeekFrom {
    Start(u32),
    Current(i32),
    End(i32),
}

/// File open flags
///
/// Combine with `|`, e.g. `OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::APPEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OpenFlags(u8);

impl OpenFlags {
    pub const READ: Self = Self(0x01);
    pub const WRITE: Self = Self(0x02);
    pub const CREATE: Self = Self(0x04);
    pub const EXCL: Self = Self(0x08);
    pub const TRUNCATE: Self = Self(0x10);
    pub const APPEND: Self = Self(0x20);

    /// Raw flag bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every flag in `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if the handle may be read from
    pub const fn readable(self) -> bool {
        self.contains(Self::READ)
    }

    /// True if the handle may be written to
    pub const fn writable(self) -> bool {
        self.contains(Self::WRITE)
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Block-structured file store
///
/// Mirrors the littlefs call surface. Handles are owned values: `close`
/// consumes them, so a closed handle cannot be used again by safe code.
/// Every method is synchronous; callers that share a store between
/// execution contexts wrap it in a mutex.
pub trait FileStore {
    /// Open file handle
    type File;
    /// Open directory handle
    type Dir;

    /// Open a file
    fn open(&mut self, path: &str, flags: OpenFlags) -> Result<Self::File, StorageError>;

    /// Sync and close a file
    fn close(&mut self, file: Self::File) -> Result<(), StorageError>;

    /// Read from the current position
    ///
    /// Returns the number of bytes read; 0 means end of file.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write at the current position (or the end, for append handles)
    ///
    /// Returns the number of bytes written.
    fn write(&mut self, file: &mut Self::File, data: &[u8]) -> Result<usize, StorageError>;

    /// Move the file position, returning the new absolute position
    fn seek(&mut self, file: &mut Self::File, pos: SeekFrom) -> Result<u32, StorageError>;

    /// Look up an entry by path
    fn stat(&mut self, path: &str) -> Result<Metadata, StorageError>;

    /// Open a directory for listing
    fn open_dir(&mut self, path: &str) -> Result<Self::Dir, StorageError>;

    /// Read the next entry, or `None` at the end of the directory
    fn read_dir(&mut self, dir: &mut Self::Dir) -> Result<Option<DirEntry>, StorageError>;

    /// Close a directory handle
    fn close_dir(&mut self, dir: Self::Dir) -> Result<(), StorageError>;

    /// Remove a file or an empty directory
    fn remove(&mut self, path: &str) -> Result<(), StorageError>;

    /// Create a directory
    fn mkdir(&mut self, path: &str) -> Result<(), StorageError>;

    /// Erase the store and write an empty filesystem
    ///
    /// Leaves the store unmounted.
    fn format(&mut self) -> Result<(), StorageError>;

    /// Mount the store
    fn mount(&mut self) -> Result<(), StorageError>;

    /// Number of blocks currently allocated
    fn used_blocks(&mut self) -> Result<u32, StorageError>;

    /// Total number of blocks in the store
    fn block_count(&self) -> u32;

    /// Block size in bytes
    fn block_size(&self) -> u32;
}

/// Mount the store, formatting it first if it cannot be mounted
///
/// A store that fails to mount is assumed blank (first boot) and is
/// formatted once before retrying.
pub fn mount_or_format<S: FileStore + ?Sized>(store: &mut S) -> Result<(), StorageError> {
    if store.mount().is_ok() {
        return Ok(());
    }
    store.format()?;
    store.mount()
}
