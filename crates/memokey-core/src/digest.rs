//! # Digest: Fixed-Size Content Identity
//!
//! Defines [`Digest`], the 32-byte output of the digest engine, and
//! [`HashAlgorithm`], the tag selecting which primitive produced it.
//!
//! Digests are totally ordered by byte-lexicographic comparison. The digest
//! engine relies on this order to hash unordered collections: element
//! digests are sorted before being combined, which works even when the
//! elements themselves have no intrinsic order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DigestParseError};

/// Length in bytes of every digest produced by memokey.
pub const DIGEST_LEN: usize = 32;

/// The hash primitive behind a [`HashAccumulator`](crate::HashAccumulator).
///
/// Neither primitive is used for its security properties; both are fast,
/// general-purpose hashes with 32-byte output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256.
    #[default]
    Sha256,
    /// BLAKE3 in its default 32-byte output mode.
    Blake3,
}

impl HashAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// A 32-byte content digest.
///
/// Equality is byte equality and ordering is byte-lexicographic, so a
/// `Digest` can be used directly as a sort or dedup key.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Wrap raw digest bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Access the raw digest bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, DigestParseError> {
        let hex = hex.trim();
        if hex.len() != DIGEST_LEN * 2 {
            return Err(DigestParseError::InvalidLength(hex.len()));
        }
        let mut out = [0u8; DIGEST_LEN];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk).map_err(|_| DigestParseError::InvalidHex(i))?;
            out[i] = u8::from_str_radix(s, 16).map_err(|_| DigestParseError::InvalidHex(i))?;
        }
        Ok(Self(out))
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
