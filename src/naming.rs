//! Stream name derivation
//!
//! The backend relay is addressed by a short name derived from the source id.
//! The derivation is a 31-multiplier string hash over UTF-16 code units with
//! 32-bit wraparound, rendered unsigned in base 32. Backends that already hold
//! names produced by the browser player depend on this being bit-for-bit
//! identical, so code units (not chars) are hashed.
//!
//! Collisions are possible in the 32-bit space and are accepted.

use crate::error::{Error, Result};

const DIGITS: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// Backend stream name, also used as the event bus topic key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamName(String);

impl StreamName {
    /// Derive the stream name for a source id
    pub fn derive(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(Error::InvalidInput("source id must not be empty".into()));
        }

        let hash = source
            .encode_utf16()
            .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as u32));

        Ok(Self(to_base32(hash)))
    }

    /// Wrap an already derived name
    pub fn from_raw(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn to_base32(mut value: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::with_capacity(7);
    while value > 0 {
        out.push(DIGITS[(value % 32) as usize]);
        value /= 32;
    }
    out.reverse();

    // Only ASCII digits were pushed
    String::from_utf8_lossy(&out).into_owned()
}
