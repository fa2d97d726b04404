//! Engine configuration.
//!
//! Selects the hash primitive and which fallback paths the dispatcher and
//! digest engine may take. Defaults are the permissive settings: every
//! value has a digest. Override via environment variables, a YAML file, or
//! explicit construction.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digest::HashAlgorithm;
use crate::error::ConfigError;

/// Configuration shared by the dispatcher, canonicalizer, and digest engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemokeyConfig {
    /// Hash primitive used for every accumulator.
    pub algorithm: HashAlgorithm,
    /// Allow the Unknown handler (type name + text rendering) when nothing
    /// else resolves an opaque type.
    pub unknown_fallback: bool,
    /// Consult registered handlers and structural probes for opaque values.
    pub opaque_extensions: bool,
    /// Fail with `ExtensionUnavailable` instead of degrading to the Unknown
    /// fallback when a handler's serializer is missing.
    pub strict_extensions: bool,
}

impl Default for MemokeyConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            unknown_fallback: true,
            opaque_extensions: true,
            strict_extensions: false,
        }
    }
}

impl MemokeyConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `MEMOKEY_ALGORITHM` (default: `sha256`)
    /// - `MEMOKEY_UNKNOWN_FALLBACK` (default: `true`)
    /// - `MEMOKEY_OPAQUE_EXTENSIONS` (default: `true`)
    /// - `MEMOKEY_STRICT_EXTENSIONS` (default: `false`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply any `MEMOKEY_*` variables present on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(raw) = std::env::var("MEMOKEY_ALGORITHM") {
            self.algorithm = HashAlgorithm::from_str(&raw)?;
        }
        self.unknown_fallback = env_bool("MEMOKEY_UNKNOWN_FALLBACK", self.unknown_fallback)?;
        self.opaque_extensions = env_bool("MEMOKEY_OPAQUE_EXTENSIONS", self.opaque_extensions)?;
        self.strict_extensions = env_bool("MEMOKEY_STRICT_EXTENSIONS", self.strict_extensions)?;
        Ok(self)
    }

    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML (or JSON) configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }
}

fn env_bool(var: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
