//! Logical command mapping and the single-byte wire command.
//!
//! The UI speaks in logical commands (`"forward"`, `"stop"`); the robot
//! firmware reads one character per command. [`CommandRouter`] bridges the
//! two: it looks the logical name up in a [`CommandMap`], falls back to the
//! name itself when there is no entry, and keeps only the first character.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;

/// One command byte as the firmware reads it.
///
/// The ROS link publishes it as a `std_msgs/msg/Char`, the serial link
/// writes it verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteCommand(u8);

impl ByteCommand {
    /// Wraps a raw byte.
    #[must_use]
    pub const fn new(byte: u8) -> Self {
        Self(byte)
    }

    /// Returns the raw byte.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ByteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.0))
    }
}

impl TryFrom<&str> for ByteCommand {
    type Error = BridgeError;

    /// Encodes the first character of `payload`.
    ///
    /// The character must fit in one byte (code point ≤ U+00FF).
    fn try_from(payload: &str) -> Result<Self, Self::Error> {
        let Some(first) = payload.chars().next() else {
            return Err(BridgeError::InvalidCommand("empty payload".to_string()));
        };
        u8::try_from(u32::from(first)).map(Self).map_err(|_| {
            BridgeError::InvalidCommand(format!(
                "'{first}' does not fit in a single command byte"
            ))
        })
    }
}

/// Static logical-command → payload table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMap {
    entries: HashMap<String, String>,
}

impl CommandMap {
    /// Builds a map from `(logical, payload)` pairs.
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the payload mapped to `logical`, if any.
    #[must_use]
    pub fn get(&self, logical: &str) -> Option<&str> {
        self.entries.get(logical).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandMap {
    /// The firmware's drive keys: `w`/`s`/`a`/`d` and `x` for stop.
    fn default() -> Self {
        Self::new([
            ("forward", "w"),
            ("backward", "s"),
            ("left", "a"),
            ("right", "d"),
            ("stop", "x"),
        ])
    }
}

impl FromStr for CommandMap {
    type Err = BridgeError;

    /// Parses `name=payload` pairs separated by commas, e.g.
    /// `forward=w,backward=s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = HashMap::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((name, payload)) = pair.split_once('=') else {
                return Err(BridgeError::Config(format!(
                    "command map entry '{pair}' is not name=payload"
                )));
            };
            let (name, payload) = (name.trim(), payload.trim());
            if name.is_empty() || payload.is_empty() {
                return Err(BridgeError::Config(format!(
                    "command map entry '{pair}' has an empty side"
                )));
            }
            entries.insert(name.to_string(), payload.to_string());
        }
        Ok(Self { entries })
    }
}

/// Maps logical commands to wire payloads.
#[derive(Debug, Clone, Default)]
pub struct CommandRouter {
    map: CommandMap,
}

impl CommandRouter {
    /// Creates a router over the given table.
    #[must_use]
    pub fn new(map: CommandMap) -> Self {
        Self { map }
    }

    /// Returns the mapped payload for `logical`, truncated to its first
    /// character.
    ///
    /// Unknown commands pass through unchanged (then truncated). The
    /// firmware only reads single characters, so anything after the
    /// first one is dropped.
    #[must_use]
    pub fn map(&self, logical: &str) -> String {
        let payload = self.map.get(logical).unwrap_or(logical);
        payload.chars().take(1).collect()
    }

    /// Maps `logical` and encodes the result as a [`ByteCommand`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidCommand`] if the mapped payload is
    /// empty or its first character does not fit in one byte.
    pub fn route(&self, logical: &str) -> Result<ByteCommand, BridgeError> {
        ByteCommand::try_from(self.map(logical).as_str())
    }
}
