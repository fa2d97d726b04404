//! # Freeze Subcommand
//!
//! Prints the canonical form of a document as JSON or as display text.

use anyhow::Result;
use clap::Args;
use memokey_engine::{freeze_with, CanonicalForm, TypeDispatcher};

use crate::input::InputArgs;

/// Arguments for the freeze subcommand.
#[derive(Args, Debug)]
pub struct FreezeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print the display rendering instead of JSON.
    #[arg(long)]
    pub text: bool,

    /// Compact JSON on one line.
    #[arg(long, conflicts_with = "text")]
    pub compact: bool,
}

/// Canonical form of the input document.
pub fn frozen(args: &FreezeArgs, dispatcher: &TypeDispatcher) -> Result<CanonicalForm> {
    let value = args.input.load()?;
    Ok(freeze_with(&value, dispatcher)?)
}

/// Render `form` per the output flags.
pub fn render(args: &FreezeArgs, form: &CanonicalForm) -> Result<String> {
    Ok(if args.text {
        form.to_string()
    } else if args.compact {
        serde_json::to_string(form)?
    } else {
        serde_json::to_string_pretty(form)?
    })
}

/// Execute the freeze subcommand.
pub fn run_freeze(args: &FreezeArgs, dispatcher: &TypeDispatcher) -> Result<u8> {
    let form = frozen(args, dispatcher)?;
    println!("{}", render(args, &form)?);
    Ok(0)
}
