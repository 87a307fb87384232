// ABOUTME: Logging setup for the volume manager.
// ABOUTME: Configures tracing to output structured logs to stderr (kernel console).

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `verbose` lowers the default level to debug;
/// `RUST_LOG` always wins.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
