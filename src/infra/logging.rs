//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "CEDUP_LOG";

/// Filter used when `CEDUP_LOG` is unset or unparsable
pub const DEFAULT_FILTER: &str = "cedup=info";

static INIT: Once = Once::new();

/// Install the global subscriber once; later calls are no-ops.
///
/// `CEDUP_LOG` takes the usual `EnvFilter` syntax, e.g.
/// `CEDUP_LOG=cedup::core::cluster=trace`. Logs go to stderr so JSON written
/// to stdout stays clean.
pub fn init_tracing()
{
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        // try_init: a test harness may already own the global default
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .try_init();
    });
}
