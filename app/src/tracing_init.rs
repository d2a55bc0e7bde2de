use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static TRACING: OnceLock<()> = OnceLock::new();

/// Initialize tracing once; later calls are no-ops.
///
/// Logs go to stderr so stdout stays machine-readable. `verbose` forces the
/// `debug` level, otherwise `RUST_LOG` applies with `warn` as the fallback.
/// `SW_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing_once(verbose: bool) {
    TRACING.get_or_init(|| {
        let filter = if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        };
        let fmt_json = std::env::var("SW_LOG_FORMAT")
            .ok()
            .is_some_and(|v| v == "json");
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true);
        let _ = if fmt_json {
            builder.json().try_init()
        } else {
            builder.compact().try_init()
        };
        tracing::debug!("tracing initialized (json={})", fmt_json);
    });
}
