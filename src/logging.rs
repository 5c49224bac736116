//! Log output setup for the `tforge` binary.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is not set
pub fn default_level(verbose: bool, quiet: bool) -> Level {
    match (verbose, quiet) {
        (_, true) => Level::WARN,
        (true, false) => Level::DEBUG,
        (false, false) => Level::INFO,
    }
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over the `-v`/`-q` flags. Calling this twice
/// is harmless; the second call keeps the first subscriber.
pub fn init(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("themeforge={}", default_level(verbose, quiet))));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false)
        .try_init();
}
