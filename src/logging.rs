//! Tracing subscriber setup for the `recall` binary.

use tracing_subscriber::EnvFilter;

/// Environment variable read for the log filter.
pub const LOG_ENV: &str = "RECALL_LOG";

/// Install a global `fmt` subscriber writing to stderr.
///
/// Respects `RECALL_LOG` (e.g. `debug`, `memory_recall_core=debug`), falling
/// back to `info`. With `json` set, events are emitted as JSON lines.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
