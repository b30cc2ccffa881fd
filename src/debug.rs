use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Initialize debug mode from environment variable.
/// Called once when the worker runtime starts.
pub fn init() {
    if std::env::var("REQL_CURSOR_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
    {
        DEBUG_ENABLED.store(true, Ordering::SeqCst);
        tracing::debug!(target: "reqlcursor", "Debug mode enabled via REQL_CURSOR_DEBUG");
    }
}

/// Set debug mode at runtime.
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled {
        tracing::debug!(target: "reqlcursor", "Debug mode enabled");
    }
}

/// Check if debug mode is active.
pub fn is_debug() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

/// Emit a `tracing` debug event if debug mode is enabled.
macro_rules! debug_log {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug() {
            tracing::debug!(target: "reqlcursor", $($arg)*);
        }
    };
}

pub(crate) use debug_log;
