//! # memokey-cli: Command-Line Interface
//!
//! The `memokey` binary computes content fingerprints of JSON and YAML
//! documents.
//!
//! ## Subcommands
//!
//! - `memokey digest FILE`: print the digest.
//! - `memokey freeze FILE`: print the canonical form.
//! - `memokey verify FILE --expect HEX`: compare against a known digest.
//! - `memokey handlers`: list registered opaque types and configuration.
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; each subcommand module exposes a
//!   `run_*` function returning the process exit code.
//! - Fingerprinting logic lives in `memokey-engine`; nothing here changes
//!   digests.

pub mod digest;
pub mod freeze;
pub mod handlers;
pub mod input;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};
use memokey_core::{HashAlgorithm, MemokeyConfig};
use memokey_engine::TypeDispatcher;

/// Resolve configuration: file (or defaults), then `MEMOKEY_*` environment
/// variables, then the `--algorithm` flag.
pub fn load_config(path: Option<&Path>, algorithm: Option<HashAlgorithm>) -> Result<MemokeyConfig> {
    let base = match path {
        Some(path) => MemokeyConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => MemokeyConfig::default(),
    };
    let mut config = base
        .with_env_overrides()
        .context("invalid MEMOKEY_* environment")?;
    if let Some(algorithm) = algorithm {
        config.algorithm = algorithm;
    }
    Ok(config)
}

/// A dispatcher for `config` with the tensor types registered.
pub fn build_dispatcher(config: MemokeyConfig) -> TypeDispatcher {
    let dispatcher = TypeDispatcher::with_config(config);
    memokey_tensor::register(&dispatcher);
    tracing::debug!(?config, types = dispatcher.type_names().len(), "dispatcher ready");
    dispatcher
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memokey.yaml");
        std::fs::write(&path, "algorithm: sha256\nstrict_extensions: true\n").unwrap();

        let config = load_config(Some(&path), Some(HashAlgorithm::Blake3)).unwrap();
        assert_eq!(config.algorithm, HashAlgorithm::Blake3);
        assert!(config.strict_extensions);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.yaml")), None).is_err());
    }

    #[test]
    fn dispatcher_knows_tensor_types() {
        let d = build_dispatcher(MemokeyConfig::default());
        assert!(d.type_names().iter().any(|n| n.ends_with("DenseArray")));
    }
}
