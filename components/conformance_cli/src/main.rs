//! Conformance runner
//!
//! Entry point for `conformance-run`. Parses CLI arguments, installs
//! logging and delegates to [`conformance_cli::run`].

use clap::Parser as ClapParser;
use conformance_cli::{exit_code, run, Cli};
use conformance_harness::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Conventional status for a second interrupt
const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .with_writer(std::io::stderr)
        .try_init();

    // First Ctrl-C cancels the run and keeps the partial report; a second one exits.
    let cancellation = CancellationToken::new();
    let token = cancellation.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if token.is_cancelled() {
            std::process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("Interrupted: cancelling remaining tests");
        token.cancel();
    }) {
        tracing::warn!(error = %e, "could not install interrupt handler");
    }

    let outcome = run(&cli, cancellation);
    if let Err(e) = &outcome {
        eprintln!("Error: {}", e);
    }
    std::process::exit(exit_code(&outcome));
}
