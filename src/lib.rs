pub mod config;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Install the stderr tracing subscriber. Call once, from the binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
