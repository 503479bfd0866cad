use std::io;

use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(debug: bool) -> &'static str {
    if debug { "wordfreq=debug" } else { "warn" }
}

/// Install the global subscriber. Logs go to stderr so stdout only carries
/// the report.
pub fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(debug)
        .with_thread_names(debug)
        .init();
}
