//! Logging setup for the command line

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Default filter for a verbosity level when `RUST_LOG` is not set
fn default_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn,wayfinder=info",
        1 => "info,wayfinder=debug,wayfinder_lib=debug",
        _ => "debug,wayfinder=trace,wayfinder_lib=trace",
    }
}

/// Install the fmt subscriber, filtered by `RUST_LOG` or the verbosity flag
///
/// Logs go to stderr so directives on stdout stay machine-readable.
pub fn setup_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose > 0)
        .with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).init();

    tracing::debug!(verbose, "Logging initialized");
}
