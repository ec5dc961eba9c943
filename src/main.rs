//! # `regconf`
//!
//! `regconf` inspects, edits and validates a container registry's
//! `config.yaml` the way the registry's setup wizard does.
//!
//! ## Usage
//!
//! ```sh
//! regconf --config conf/stack/config.yaml show TLS_SETTING
//! regconf --config conf/stack/config.yaml set TLS_SETTING external-tls
//! regconf --config conf/stack/config.yaml storage add us-east --engine S3Storage
//! regconf --config conf/stack/config.yaml --setup save
//! ```
//!
//! Exit codes: 1 configuration, 2 document, 3 validation, 4 filesystem,
//! 5 rejected edit.

use clap::Parser as _;
use regconf::cli::Args;
use regconf::error::EditorError;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    match regconf::run(&args) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!("{err:#}");
            std::process::exit(
                err.downcast_ref::<EditorError>()
                    .map_or(1, EditorError::exit_code),
            );
        }
    }
}
