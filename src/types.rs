//! Core types: Symbol, Bucket

use std::fmt;

use crate::error::{Error, Result};

/// Maximum symbol length in bytes.
pub const SYMBOL_MAX_LEN: usize = 8;

/// Instrument identifier, stored inline (no heap allocation).
///
/// Holds 1 to 8 printable ASCII bytes. `Symbol` is `Copy`, so it can be used freely as a
/// map key and passed around by value. Ordering is lexicographic on the bytes,
/// which gives every per-cycle output a stable order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    // Field order matters for the derived `Ord`: zero padding sorts first.
    bytes: [u8; SYMBOL_MAX_LEN],
    len: u8,
}

impl Symbol {
    /// Create a symbol from a string.
    ///
    /// # Panics
    ///
    /// Panics if `s` is empty, longer than 8 bytes, or not printable ASCII.
    /// Use [`Symbol::try_new`] for untrusted input.
    #[track_caller]
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Ok(sym) => sym,
            Err(e) => panic!("{e}"),
        }
    }

    /// Create a symbol, rejecting invalid input.
    pub fn try_new(s: &str) -> Result<Self> {
        let printable = s.bytes().all(|b| b.is_ascii_graphic());
        if s.is_empty() || s.len() > SYMBOL_MAX_LEN || !printable {
            return Err(Error::InvalidSymbol(s.to_string()));
        }
        let mut bytes = [0u8; SYMBOL_MAX_LEN];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self {
            bytes,
            len: s.len() as u8,
        })
    }

    /// The symbol as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        // Only ASCII is ever stored
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_new(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Symbol::try_new(&s).map_err(serde::de::Error::custom)
    }
}

/// Which side of the book a desired instrument sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Bucket {
    Long,
    Short,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Long => f.pad("long"),
            Bucket::Short => f.pad("short"),
        }
    }
}
