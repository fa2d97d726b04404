//! # Digest Subcommand
//!
//! Prints the hex digest of a document, `sha256sum`-style.

use anyhow::Result;
use clap::Args;
use memokey_engine::{digest_with, TypeDispatcher};

use crate::input::InputArgs;

/// Arguments for the digest subcommand.
#[derive(Args, Debug)]
pub struct DigestArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print only the digest, without the file name.
    #[arg(long, short)]
    pub quiet: bool,
}

/// Compute the digest and return its hex form.
pub fn digest_hex(args: &DigestArgs, dispatcher: &TypeDispatcher) -> Result<String> {
    let value = args.input.load()?;
    Ok(digest_with(&value, dispatcher)?.to_hex())
}

/// Execute the digest subcommand.
pub fn run_digest(args: &DigestArgs, dispatcher: &TypeDispatcher) -> Result<u8> {
    let hex = digest_hex(args, dispatcher)?;
    if args.quiet {
        println!("{hex}");
    } else {
        println!("{hex}  {}", args.input.file.display());
    }
    Ok(0)
}
