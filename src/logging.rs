use std::sync::OnceLock;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Installs the `env_logger` backend once per process.
///
/// Defaults to `info`; `RUST_LOG` overrides. Safe to call repeatedly.
pub fn init() {
    LOGGER_INIT.get_or_init(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_millis()
            .try_init();
    });
}
