//! Path payload handling
//!
//! Path-bearing commands carry the path as the packet payload, zero padded
//! to the end of the report. [`extract`] validates it before any storage
//! call; [`resolve`] applies the working directory when relative
//! resolution is enabled.

use heapless::{String, Vec};

use crate::error::ValidationError;

/// Longest path accepted from a packet (exclusive)
pub const MAX_PATH_LEN: usize = 256;

/// Capacity of the working directory string
pub const DIRECTORY_MAX: usize = 64;

/// Owned path buffer
pub type PathBuf = String<MAX_PATH_LEN>;

/// Most components a normalized path can hold
const MAX_COMPONENTS: usize = 32;

/// Validate and borrow a path from a payload
///
/// The path ends at the first NUL byte. It must be non-empty, shorter than
/// `limit` and valid UTF-8.
pub fn extract(payload: &[u8], limit: usize) -> Result<&str, ValidationError> {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    let raw = &payload[..end];

    if raw.is_empty() {
        return Err(ValidationError::InsufficientData);
    }
    if raw.len() >= limit {
        return Err(ValidationError::PathTooLong);
    }
    core::str::from_utf8(raw).map_err(|_| ValidationError::InvalidPath)
}

/// Collapse `.` and `..` components and repeated separators
///
/// The result is always absolute. `..` at the root stays at the root.
pub fn normalize(path: &str) -> Result<PathBuf, ValidationError> {
    let mut parts: Vec<&str, MAX_COMPONENTS> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name).map_err(|_| ValidationError::PathTooLong)?,
        }
    }

    let mut out = PathBuf::new();
    if parts.is_empty() {
        out.push('/').map_err(|_| ValidationError::PathTooLong)?;
        return Ok(out);
    }
    for part in parts {
        out.push('/').map_err(|_| ValidationError::PathTooLong)?;
        out.push_str(part).map_err(|_| ValidationError::PathTooLong)?;
    }
    Ok(out)
}

/// Resolve `path` against the working directory `cwd`
///
/// Absolute paths ignore `cwd`.
pub fn resolve(cwd: &str, path: &str) -> Result<PathBuf, ValidationError> {
    if path.starts_with('/') {
        return normalize(path);
    }

    let mut joined: String<{ MAX_PATH_LEN + DIRECTORY_MAX + 1 }> = String::new();
    for part in [cwd, "/", path] {
        joined
            .push_str(part)
            .map_err(|_| ValidationError::PathTooLong)?;
    }
    normalize(&joined)
}
