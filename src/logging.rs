use tracing_subscriber::EnvFilter;

/// Installs a stderr `fmt` subscriber filtered by `filter` (`RUST_LOG`
/// syntax). `RUST_LOG` takes precedence when set. Calling this again after a
/// subscriber is installed does nothing.
pub fn init(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
