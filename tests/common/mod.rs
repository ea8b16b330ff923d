#![allow(dead_code)]

use std::sync::Once;
use std::thread;
use std::time::Duration;

static INIT_LOGGING: Once = Once::new();

/// Install a trace-level fmt subscriber writing through the test harness. Only the first call
/// does anything.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}

pub fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms))
}
