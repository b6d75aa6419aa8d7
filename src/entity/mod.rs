use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;


/// Opaque, process-local reference to a world entity.
///
/// Handles are stable for the lifetime of the process and are never persisted.
/// The zero handle is the sentinel for "no entity".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityHandle(u64);

impl EntityHandle {
    /// Sentinel handle; never cached, never indexed
    pub const NULL: EntityHandle = EntityHandle(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for EntityHandle {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entity handle parsing errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseHandleError {
    /// Empty input
    #[error("entity handle is empty")]
    Empty,
    /// Not a decimal or `0x`-prefixed hex number
    #[error("invalid entity handle: {0}")]
    InvalidFormat(String),
}

/// Parse an entity handle from its textual form
///
/// Supports two formats:
/// - decimal: "42"
/// - hex with `0x` prefix: "0x2a"
///
/// # Examples
///
/// ```
/// use shapecache::entity::parse_handle;
///
/// assert_eq!(parse_handle("42").unwrap().get(), 42);
/// assert_eq!(parse_handle("0x2a").unwrap().get(), 42);
/// assert!(parse_handle("0").unwrap().is_null());
/// ```
pub fn parse_handle(input: &str) -> Result<EntityHandle, ParseHandleError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseHandleError::Empty);
    }

    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) if hex.is_empty() => {
            return Err(ParseHandleError::InvalidFormat(format!(
                "'{}' has no digits after the hex prefix",
                input
            )))
        }
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };

    parsed
        .map(EntityHandle)
        .map_err(|e| ParseHandleError::InvalidFormat(format!("'{}': {}", input, e)))
}

impl FromStr for EntityHandle {
    type Err = ParseHandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_handle(s)
    }
}
