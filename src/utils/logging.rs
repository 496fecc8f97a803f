/// Global level Warn, this crate at Info. `RUST_LOG` overrides both.
pub fn init_log() {
    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Debug)
    } else {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    };

    let mut builder = env_logger::Builder::new();

    // try_init: tests and repeated calls must not panic on a second logger.
    let _ = builder
        .filter(None, global_level)
        .filter(Some("funding_tracker"), my_code_level)
        .parse_default_env()
        .try_init();
}
