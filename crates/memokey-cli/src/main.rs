//! # memokey CLI entry point
//!
//! Parses arguments, installs the tracing subscriber, builds the dispatcher
//! and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use memokey_core::HashAlgorithm;
use tracing_subscriber::EnvFilter;

use memokey_cli::digest::{run_digest, DigestArgs};
use memokey_cli::freeze::{run_freeze, FreezeArgs};
use memokey_cli::handlers::{run_handlers, HandlersArgs};
use memokey_cli::verify::{run_verify, VerifyArgs};
use memokey_cli::{build_dispatcher, load_config};

/// Deterministic content fingerprints for nested documents.
#[derive(Parser, Debug)]
#[command(name = "memokey", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hash primitive (sha256 or blake3). Overrides config and environment.
    #[arg(long, global = true)]
    algorithm: Option<HashAlgorithm>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the digest of a JSON or YAML document.
    Digest(DigestArgs),

    /// Print the canonical form of a document.
    Freeze(FreezeArgs),

    /// Check a document against an expected digest.
    Verify(VerifyArgs),

    /// List registered opaque types and the active configuration.
    Handlers(HandlersArgs),
}

fn init_tracing(verbose: u8, json: bool) {
    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = match load_config(cli.config.as_deref(), cli.algorithm) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(2);
        }
    };
    let dispatcher = build_dispatcher(config);

    let result = match &cli.command {
        Commands::Digest(args) => run_digest(args, &dispatcher),
        Commands::Freeze(args) => run_freeze(args, &dispatcher),
        Commands::Verify(args) => run_verify(args, &dispatcher),
        Commands::Handlers(args) => run_handlers(args, &dispatcher),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
