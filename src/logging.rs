//! Logging initialization.
//!
//! Progress lines (`[found]`, `[shrink]`, ...) are `tracing` events. INFO and
//! DEBUG go to stdout, WARN and ERROR go to stderr, so per-file failures can
//! be separated from the normal report.

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// `verbose` enables DEBUG (include/exclude/skip decisions); otherwise
/// INFO. `RUST_LOG` overrides both. Safe to call more than once.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .without_time()
                .with_target(false)
                .with_level(false)
                .with_ansi(console::colors_enabled())
                .with_writer(writer),
        )
        .try_init();
}
