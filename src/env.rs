//! Environment variable names used when configuration comes from an
//! invocation wrapper rather than explicit `setup` arguments.

/// Minimum severity for the process logger.
pub const LOG_LEVEL_ENV: &str = "log_level";

/// Applied when [`LOG_LEVEL_ENV`] is unset.
pub const DEFAULT_LOG_LEVEL: &str = "DEBUG";

/// Minimum severity for noisy dependency namespaces, see
/// [`crate::Setup::quiet_targets`].
pub const QUIET_LEVEL_ENV: &str = "boto_level";

/// Applied when [`QUIET_LEVEL_ENV`] is unset.
pub const DEFAULT_QUIET_LEVEL: &str = "WARN";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
