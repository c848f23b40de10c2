// dip_sim/src/logging.rs

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,dip_core=info,dip_sim=debug";
const VERBOSE_FILTER: &str = "info,dip_core=debug,dip_sim=debug";

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Installs the global subscriber, writing to stderr so JSON on stdout stays clean.
/// A second call is a no-op.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
