//! Tracing/logging setup shared by every binary and test harness.

/// Initialize process-wide logging with the defaults.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize process-wide logging from configuration.
pub fn init_with(config: &LoggingConfig) {
    tracing::init_with(config);
}

pub mod tracing;

pub use self::tracing::LoggingConfig;
