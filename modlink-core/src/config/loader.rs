//! Configuration loading
//!
//! Reads `/module.toml` from the module's own file store. A store without
//! the file yields the defaults; the caller decides what to do with a
//! broken one (the module falls back to defaults as well).

use modlink_hal::{FileStore, OpenFlags, StorageError};

use super::toml::{parse_config, ParseError};
use super::types::ModuleConfig;

/// Location of the config file on the store
pub const CONFIG_PATH: &str = "/module.toml";

/// Maximum TOML config size
const MAX_TOML_SIZE: usize = 1024;

/// Configuration loading errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Store operation failed
    Storage(StorageError),
    /// File does not fit the read buffer
    TooLarge,
    /// Invalid UTF-8 in TOML data
    InvalidUtf8,
    /// TOML parsing failed
    Parse(ParseError),
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        ConfigError::Storage(e)
    }
}

impl From<ParseError> for ConfigError {
    fn from(e: ParseError) -> Self {
        ConfigError::Parse(e)
    }
}

/// Load the module configuration from `store`
pub fn load_config<S: FileStore + ?Sized>(store: &mut S) -> Result<ModuleConfig, ConfigError> {
    let mut file = match store.open(CONFIG_PATH, OpenFlags::READ) {
        Ok(file) => file,
        Err(StorageError::NotFound) => {
            debug!("no config file, using defaults");
            return Ok(ModuleConfig::default());
        }
        Err(e) => return Err(e.into()),
    };

    let mut buffer = [0u8; MAX_TOML_SIZE];
    let read = read_all(store, &mut file, &mut buffer);
    let closed = store.close(file);
    let len = read?;
    closed?;

    let text = core::str::from_utf8(&buffer[..len]).map_err(|_| ConfigError::InvalidUtf8)?;
    let config = parse_config(text)?;

    info!(
        "config loaded: fps={=u8} sequence={=bool}",
        config.display.fps,
        config.protocol.enforce_sequence
    );
    Ok(config)
}

/// Fill `buffer` from `file`; a file larger than the buffer is an error
fn read_all<S: FileStore + ?Sized>(
    store: &mut S,
    file: &mut S::File,
    buffer: &mut [u8],
) -> Result<usize, ConfigError> {
    let mut len = 0;
    loop {
        if len == buffer.len() {
            let mut probe = [0u8; 1];
            return match store.read(file, &mut probe)? {
                0 => Ok(len),
                _ => Err(ConfigError::TooLarge),
            };
        }
        match store.read(file, &mut buffer[len..])? {
            0 => return Ok(len),
            n => len += n,
        }
    }
}
