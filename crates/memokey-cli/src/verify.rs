//! # Verify Subcommand
//!
//! Recomputes a document's digest and compares it with an expected value.
//! Exit code 0 on match, 1 on mismatch.

use anyhow::{Context, Result};
use clap::Args;
use memokey_core::Digest;
use memokey_engine::{digest_with, TypeDispatcher};

use crate::input::InputArgs;

/// Arguments for the verify subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Expected digest, 64 hex characters.
    #[arg(long)]
    pub expect: String,
}

/// Execute the verify subcommand.
pub fn run_verify(args: &VerifyArgs, dispatcher: &TypeDispatcher) -> Result<u8> {
    let expected = Digest::from_hex(args.expect.trim())
        .with_context(|| format!("--expect is not a digest: {:?}", args.expect))?;
    let value = args.input.load()?;
    let actual = digest_with(&value, dispatcher)?;

    if actual == expected {
        println!("OK  {}", args.input.file.display());
        Ok(0)
    } else {
        tracing::warn!(expected = %expected, actual = %actual, "digest mismatch");
        println!("MISMATCH  {}", args.input.file.display());
        println!("  expected: {expected}");
        println!("  actual:   {actual}");
        Ok(1)
    }
}
