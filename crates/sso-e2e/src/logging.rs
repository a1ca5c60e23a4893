//! Test logging setup.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
///
/// Only installs a subscriber when `RUST_LOG` is set, so test output stays
/// quiet by default.
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}
