//! Tracing initialization

/// Initialize tracing for console output
///
/// Call early in main() before any logging occurs.
/// `RUST_LOG` wins over `verbose` when set.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(filter)
        .try_init();
}
