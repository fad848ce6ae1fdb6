//! Conditional logging macros gated on a module-level `ENABLE_LOGS` const.
//!
//! Chatty modules (the scan loop logs per window) define
//! `const ENABLE_LOGS: bool = ...;` and use these; infrastructure modules
//! use the `log` macros directly.

/// Info-level logging, compiled out when the calling module sets
/// `ENABLE_LOGS` to false.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level counterpart of [`log_info!`].
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error-level counterpart of [`log_info!`].
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
