//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber writing to stdout.
///
/// `RUST_LOG` overrides the level chosen from `verbose`. Verbose output also
/// carries source file and line.
pub fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_file(verbose)
        .with_line_number(verbose);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}
