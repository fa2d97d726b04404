//! # Handlers Subcommand
//!
//! Lists the opaque types registered on the dispatcher and the active
//! configuration.

use anyhow::Result;
use clap::Args;
use memokey_engine::TypeDispatcher;

/// Arguments for the handlers subcommand.
#[derive(Args, Debug)]
pub struct HandlersArgs {
    /// Print the listing as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the handlers subcommand.
pub fn run_handlers(args: &HandlersArgs, dispatcher: &TypeDispatcher) -> Result<u8> {
    let config = dispatcher.config();
    let types = dispatcher.type_names();

    if args.json {
        let doc = serde_json::json!({
            "config": config,
            "types": types,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(0);
    }

    println!("algorithm:          {}", config.algorithm);
    println!("unknown fallback:   {}", config.unknown_fallback);
    println!("opaque extensions:  {}", config.opaque_extensions);
    println!("strict extensions:  {}", config.strict_extensions);
    println!();
    println!("Registered types:");
    for name in &types {
        println!("  {name}");
    }
    println!();
    println!("Total: {} types", types.len());
    Ok(0)
}
