//! Command core for the modlink display module
//!
//! This crate holds everything between "a raw HID report arrived" and "a
//! reply report goes out", independent of the board it runs on:
//!
//! - Command dispatch over the [`modlink_protocol`] packet format
//! - File store command handlers (ls, cd, cat, open/write/close, ...)
//! - Chunked write buffering aligned to flash pages
//! - Double-buffered animation playback with a background loader and a
//!   frame timer
//! - Module configuration (TOML subset, loaded from the store)
//!
//! The store and display are reached only through the [`modlink_hal`]
//! traits. Shared state is guarded by `embassy-sync` primitives generic
//! over the raw mutex, so the same code runs under interrupts on target
//! and with `NoopRawMutex` in host tests.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod anim;
pub mod chunk;
pub mod config;
pub mod error;
pub mod handlers;
pub mod module;
pub mod path;
pub mod session;

pub use anim::{Player, TickOutcome};
pub use chunk::{ChunkBuffer, CHUNK_SIZE};
pub use config::ModuleConfig;
pub use error::{CommandError, ValidationError};
pub use module::{Module, SharedStore, TimeOfDay};
