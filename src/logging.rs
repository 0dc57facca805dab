use std::io;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize diagnostics on stderr, filtered by `RUST_LOG` (default `info`).
///
/// `verbose` raises the default to `debug` when `RUST_LOG` is unset. Stdout
/// is left to the `summary`, `export` and display outputs.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}
