//! Logging setup and conditional logging macros.
//!
//! Background loops (poller, preview, watchdog) are chatty, so each module
//! gates its output behind a module-level `ENABLE_LOGS` flag:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("poller started for job {}", job_id);
//! ```

/// Environment variable that switches the default log level to `Debug`.
pub const DEBUG_ENV_VAR: &str = "CAPTURE_ENGINE_DEBUG";

/// Initialize `env_logger` for the host process.
///
/// `RUST_LOG` still wins when set. Calling this more than once is harmless.
pub fn init_logging() {
    let debug_mode = std::env::var(DEBUG_ENV_VAR)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let level = if debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Info logging, enabled when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Debug logging, enabled when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Warn logging, enabled when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error logging, enabled when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
