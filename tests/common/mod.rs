use std::sync::Once;

use env_logger::Builder;
use log::LevelFilter;

static INIT: Once = Once::new();

/// Installs a test logger once per test binary. `RUST_LOG` overrides the
/// default level.
pub fn init_logger() {
    INIT.call_once_force(|_| {
        let mut builder = Builder::new();
        builder
            .filter_level(LevelFilter::Warn)
            .filter_module("byte_table", LevelFilter::Info)
            .is_test(true)
            .format_timestamp_millis()
            .parse_default_env();
        // Another harness may have installed a logger already.
        let _ = builder.try_init();
    });
}
