use std::io;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber, writing to stderr so log lines never mix
/// with procedure output on stdout.
///
/// `RUST_LOG` selects the filter, defaulting to `warn`; `debug` forces
/// `debug`. Calling this more than once is harmless.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
