//! Simple TOML parser for module configuration
//!
//! Handles only the subset the module config needs: no arrays, tables
//! of tables or multi-line strings.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - [section] headers
//! - Comments (# ...)
//!
//! Unknown keys are ignored so newer host tools can write settings older
//! modules do not know about. Unknown sections are errors.

use super::types::{ListingMode, ModuleConfig, PathResolution, MAX_FPS, MIN_FPS};

/// Settings the module understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigKey {
    /// `[protocol] listing`
    Listing,
    /// `[protocol] paths`
    Paths,
    /// `[protocol] enforce_sequence`
    EnforceSequence,
    /// `[display] fps`
    Fps,
}

impl ConfigKey {
    fn lookup(section: Section, key: &str) -> Option<Self> {
        match (section, key) {
            (Section::Protocol, "listing") => Some(ConfigKey::Listing),
            (Section::Protocol, "paths") => Some(ConfigKey::Paths),
            (Section::Protocol, "enforce_sequence") => Some(ConfigKey::EnforceSequence),
            (Section::Display, "fps") => Some(ConfigKey::Fps),
            _ => None,
        }
    }

    /// Key name as written in the file
    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::Listing => "listing",
            ConfigKey::Paths => "paths",
            ConfigKey::EnforceSequence => "enforce_sequence",
            ConfigKey::Fps => "fps",
        }
    }
}

/// Parse error; `line` is 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Header names a section other than `[protocol]` or `[display]`
    InvalidSection { line: u32 },
    /// Value for `key` is not one of its accepted forms
    InvalidValue { line: u32, key: ConfigKey },
    /// Line is neither a header, a comment nor `key = value`
    InvalidLine { line: u32 },
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Protocol,
    Display,
}

/// Parse TOML configuration into ModuleConfig
///
/// Missing keys keep their defaults.
pub fn parse_config(input: &str) -> Result<ModuleConfig, ParseError> {
    let mut config = ModuleConfig::default();
    let mut section = Section::Root;

    for (index, raw) in input.lines().enumerate() {
        let line = index as u32 + 1;
        let text = strip_comment(raw).trim();
        if text.is_empty() {
            continue;
        }

        if let Some(header) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            section = match header.trim() {
                "protocol" => Section::Protocol,
                "display" => Section::Display,
                _ => return Err(ParseError::InvalidSection { line }),
            };
            continue;
        }

        let (name, value) = split_assignment(text).ok_or(ParseError::InvalidLine { line })?;
        let Some(key) = ConfigKey::lookup(section, name) else {
            debug!("ignoring unknown config key on line {=u32}", line);
            continue;
        };
        if !apply(key, unquote(value), &mut config) {
            warn!("bad value for {=str} on line {=u32}", key.name(), line);
            return Err(ParseError::InvalidValue { line, key });
        }
    }

    Ok(config)
}

/// Store `value` under `key`; false if the value is not accepted
fn apply(key: ConfigKey, value: &str, config: &mut ModuleConfig) -> bool {
    match key {
        ConfigKey::Listing => match value {
            "split" => config.protocol.listing = ListingMode::Split,
            "truncate" => config.protocol.listing = ListingMode::Truncate,
            _ => return false,
        },
        ConfigKey::Paths => match value {
            "literal" => config.protocol.paths = PathResolution::Literal,
            "relative" => config.protocol.paths = PathResolution::RelativeToCwd,
            _ => return false,
        },
        ConfigKey::EnforceSequence => match value {
            "true" => config.protocol.enforce_sequence = true,
            "false" => config.protocol.enforce_sequence = false,
            _ => return false,
        },
        ConfigKey::Fps => match value.parse::<u8>() {
            Ok(fps) if (MIN_FPS..=MAX_FPS).contains(&fps) => config.display.fps = fps,
            _ => return false,
        },
    }
    true
}

/// Cut the line at a `#` that is not inside a quoted string
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

/// `name = value` with both sides non-empty
fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let (name, value) = text.split_once('=')?;
    let (name, value) = (name.trim(), value.trim());
    (!name.is_empty() && !value.is_empty()).then_some((name, value))
}

/// Strip surrounding quotes; bare words are accepted as strings
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
