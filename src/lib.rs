pub mod api;
pub mod config;
pub mod core;
pub mod models;

/// Install the `env_logger` backend once; `RUST_LOG` takes precedence over `level`
pub fn init_logging(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();
}
