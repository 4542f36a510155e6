//! Modlink Hardware Abstraction Layer
//!
//! This crate defines the narrow interfaces the command core consumes from
//! its external collaborators. Concrete implementations live elsewhere:
//! a littlefs-backed store on the module itself, or the RAM store in
//! `modlink-hal-ram` for host builds and tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  modlink-core (dispatch, handlers, ...) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  modlink-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │   littlefs    │       │ modlink-hal-  │
//! │  (on target)  │       │     ram       │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`storage::FileStore`] - Block-structured file store
//! - [`display::FrameSink`] - Frame buffer presentation

#![no_std]
#![deny(unsafe_code)]

pub mod display;
pub mod flash;
pub mod storage;

// Re-export key traits at crate root for convenience
pub use display::{DisplayError, FrameSink, FRAME_SIZE};
pub use storage::{
    mount_or_format, DirEntry, EntryKind, FileStore, Metadata, OpenFlags, SeekFrom,
    StorageError, NAME_MAX,
};
