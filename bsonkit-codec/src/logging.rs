//! Logging setup for bsonkit.
//!
//! The crates emit `tracing` events while building registries, resolving
//! codecs and encoding pipelines. Nothing is printed unless a subscriber is
//! installed, either by the application or by [`init`] when the
//! `tracing-subscriber` feature is enabled.
//!
//! # Environment Variables
//!
//! - `BSONKIT_DEBUG=true|1|yes` - Enable debug logging
//! - `BSONKIT_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `BSONKIT_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use bsonkit_codec::logging;
//!
//! // Call once at startup
//! logging::init();
//! ```
//!
//! Inside the crates, use the plain tracing macros:
//!
//! ```rust,ignore
//! use tracing::{debug, trace};
//!
//! debug!(codecs = count, "Built codec registry");
//! trace!(type_name, "Codec cache miss");
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check whether `BSONKIT_DEBUG` enables debug logging.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("BSONKIT_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the log level from `BSONKIT_LOG_LEVEL`.
///
/// Falls back to "debug" when `BSONKIT_DEBUG` is set and "warn" otherwise.
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("BSONKIT_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the output format from `BSONKIT_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var("BSONKIT_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize logging. Subsequent calls are no-ops.
///
/// Does nothing unless `BSONKIT_DEBUG` or `BSONKIT_LOG_LEVEL` is set, or when
/// the crate is built without the `tracing-subscriber` feature.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("BSONKIT_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "bsonkit={},bsonkit_codec={},bsonkit_aggregation={}",
                level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
            }

            tracing::info!(
                level = level,
                format = get_log_format(),
                "bsonkit logging initialized"
            );
        }
    });
}

/// Initialize logging at a specific level.
///
/// # Safety
///
/// Sets `BSONKIT_LOG_LEVEL` in the process environment. Call this at startup
/// before other threads are spawned.
pub fn init_with_level(level: &str) {
    // SAFETY: documented as startup-only, before threads exist.
    unsafe {
        env::set_var("BSONKIT_LOG_LEVEL", level);
    }
    init();
}

/// Initialize debug logging.
///
/// Equivalent to setting `BSONKIT_DEBUG=true` and calling [`init`].
///
/// # Safety
///
/// Sets `BSONKIT_DEBUG` in the process environment. Call this at startup
/// before other threads are spawned.
pub fn init_debug() {
    // SAFETY: documented as startup-only, before threads exist.
    unsafe {
        env::set_var("BSONKIT_DEBUG", "true");
    }
    init();
}

/// Debug logging that only fires when `BSONKIT_DEBUG` is enabled.
#[macro_export]
macro_rules! bsonkit_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Trace logging that only fires when `BSONKIT_DEBUG` is enabled.
#[macro_export]
macro_rules! bsonkit_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // SAFETY: only this test touches these variables.
        unsafe {
            env::remove_var("BSONKIT_DEBUG");
            env::remove_var("BSONKIT_LOG_LEVEL");
            env::remove_var("BSONKIT_LOG_FORMAT");
        }
        assert!(!is_debug_enabled());
        assert_eq!(get_log_level(), "warn");
        assert_eq!(get_log_format(), "json");
    }
}
