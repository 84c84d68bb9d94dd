//! Write request configuration and payloads.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::{FsError, Ownership};

/// Text encoding applied to [`Payload::Text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Encoding {
    /// UTF-8 (the default).
    #[default]
    Utf8,
    /// UTF-16, little endian, no byte order mark.
    Utf16Le,
    /// One byte per character; code points above 0xFF keep their low byte.
    Latin1,
}

impl Encoding {
    /// Canonical lowercase name.
    pub const fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Utf16Le => "utf16le",
            Encoding::Latin1 => "latin1",
        }
    }

    /// Encode `text` into bytes.
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        match self {
            Encoding::Utf8 => Cow::Borrowed(text.as_bytes()),
            Encoding::Utf16Le => Cow::Owned(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            Encoding::Latin1 => Cow::Owned(text.chars().map(|c| (c as u32 & 0xFF) as u8).collect()),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Encoding::Utf16Le),
            "latin1" | "binary" => Ok(Encoding::Latin1),
            _ => Err(FsError::UnknownEncoding { name: s.to_string() }),
        }
    }
}

/// Content of a write request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    /// No content: the target is created or truncated to empty.
    #[default]
    Empty,
    /// Raw bytes, written as-is.
    Bytes(Vec<u8>),
    /// Text, encoded with [`WriteOptions::encoding`].
    Text(String),
}

impl Payload {
    /// Bytes to write, or `None` when the write step is skipped.
    pub fn encode(&self, encoding: Encoding) -> Option<Cow<'_, [u8]>> {
        match self {
            Payload::Empty => None,
            Payload::Bytes(bytes) => Some(Cow::Borrowed(bytes)),
            Payload::Text(text) => Some(encoding.encode(text)),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    fn from(bytes: &[u8; N]) -> Self {
        Payload::Bytes(bytes.to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map_or(Payload::Empty, Into::into)
    }
}

/// Options for a single atomic write.
///
/// Unset `mode` and `owner` are inherited from the file being replaced.
///
/// ```rust
/// use atomic_file_write::{Encoding, Ownership, WriteOptions};
///
/// let options = WriteOptions::new()
///     .mode(0o600)
///     .owner(Ownership::new(1000, 1000))
///     .encoding(Encoding::Latin1)
///     .fsync(false);
/// assert_eq!(options.mode, Some(0o600));
/// assert!(!options.fsync);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WriteOptions {
    /// Permission bits for the new file.
    pub mode: Option<u32>,
    /// Owner for the new file.
    pub owner: Option<Ownership>,
    /// Encoding for text payloads.
    pub encoding: Encoding,
    /// Flush the temp file to stable storage before renaming.
    pub fsync: bool,
}

impl WriteOptions {
    /// Defaults: inherit attributes, UTF-8, fsync enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set explicit permission bits.
    ///
    /// A mode of `0` is treated as unset: the existing file's mode is
    /// inherited, or the filesystem default applies.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set explicit ownership.
    pub fn owner(mut self, owner: Ownership) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set the text encoding.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Enable or disable fsync before rename.
    pub fn fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            mode: None,
            owner: None,
            encoding: Encoding::Utf8,
            fsync: true,
        }
    }
}
