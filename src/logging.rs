//! Log subscriber setup for the command-line binary

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a compact stderr subscriber. `RUST_LOG` wins over `verbose`.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_cli_logger(verbose: bool) {
    let default_directive = if verbose {
        "domain_scout=debug,info"
    } else {
        "domain_scout=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
