//! Test-only logging helper. The embedding binary owns the real subscriber
//! (out of scope, §1); this just lets `#[cfg(test)]` modules across the
//! workspace see `tracing` output when a test fails.

use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_test_subscriber() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
