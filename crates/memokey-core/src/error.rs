//! # Error Types: Classification Failures
//!
//! Defines the error types used throughout memokey. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Every failure is a local, synchronous classification failure. Nothing
//!   is retried and nothing is swallowed; errors propagate to the caller.
//! - Each variant names the runtime type that could not be handled so the
//!   caller can register a handler for it.

use thiserror::Error;

/// Top-level error type for digest and canonicalization operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemokeyError {
    /// The dispatcher could not classify the value and the Unknown
    /// fallback is disabled.
    #[error("no handler resolves type {type_name} and the unknown fallback is disabled")]
    UnresolvedType {
        /// Fully-qualified name of the unresolved type.
        type_name: String,
    },

    /// The canonicalizer found no handler and no structural fallback
    /// applies.
    #[error("cannot freeze value of type {type_name}: no handler or structural capability")]
    UnfreezableType {
        /// Fully-qualified name of the offending type.
        type_name: String,
    },

    /// The digest engine exhausted every path for this value.
    #[error("cannot digest value of type {type_name}: {reason}")]
    UnhashableType {
        /// Fully-qualified name of the offending type.
        type_name: String,
        /// Which paths were disabled or failed.
        reason: String,
    },

    /// An opaque-type serializer is not available at call time.
    #[error("serializer `{extension}` for type {type_name} is unavailable")]
    ExtensionUnavailable {
        /// Fully-qualified name of the opaque type.
        type_name: String,
        /// Name of the missing serializer.
        extension: String,
    },
}

impl MemokeyError {
    /// Returns the type name carried by every variant.
    pub fn type_name(&self) -> &str {
        match self {
            Self::UnresolvedType { type_name }
            | Self::UnfreezableType { type_name }
            | Self::UnhashableType { type_name, .. }
            | Self::ExtensionUnavailable { type_name, .. } => type_name,
        }
    }
}

/// Errors while loading a [`MemokeyConfig`](crate::MemokeyConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// The rejected raw value.
        value: String,
    },

    /// Unrecognized hash algorithm name.
    #[error("unknown hash algorithm {0:?} (expected sha256 or blake3)")]
    UnknownAlgorithm(String),

    /// The configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Errors while parsing a hex-encoded digest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestParseError {
    /// Wrong number of hex characters.
    #[error("expected 64 hex chars, got {0}")]
    InvalidLength(usize),

    /// A non-hex character at the given byte offset.
    #[error("invalid hex at byte {0}")]
    InvalidHex(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_is_reported_for_every_variant() {
        let errors = [
            MemokeyError::UnresolvedType {
                type_name: "a::A".into(),
            },
            MemokeyError::UnfreezableType {
                type_name: "a::A".into(),
            },
            MemokeyError::UnhashableType {
                type_name: "a::A".into(),
                reason: "disabled".into(),
            },
            MemokeyError::ExtensionUnavailable {
                type_name: "a::A".into(),
                extension: "columnar".into(),
            },
        ];
        for err in &errors {
            assert_eq!(err.type_name(), "a::A");
            assert!(err.to_string().contains("a::A"));
        }
    }

    #[test]
    fn unknown_algorithm_message() {
        let err = ConfigError::UnknownAlgorithm("md4".into());
        assert!(err.to_string().contains("md4"));
    }
}
