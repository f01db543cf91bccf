//! migrastack CLI: declarative stack synthesis.

use clap::Parser;
use migrastack::cli::Cli;
use migrastack::Error;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MIGRASTACK_LOG";

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "migrastack=info",
        _ => "migrastack=debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = migrastack::cli::dispatch(cli.command) {
        if let Error::Validation(errors) = &e {
            for err in errors {
                eprintln!("  ERROR: {}", err);
            }
        }
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
