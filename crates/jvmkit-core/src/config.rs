//! Unified configuration layer.
//!
//! All environment-variable reads live here; business code goes through
//! structured config types instead of calling `std::env::var` directly.

use std::env;
use std::time::Duration;

/// Environment variable key constants.
pub mod env_keys {
    /// Suppress info-level audit events (1/true/yes).
    pub const JVMKIT_QUIET: &str = "JVMKIT_QUIET";
    /// Captured-mode poll sleep in milliseconds (default 5).
    pub const JVMKIT_POLL_INTERVAL_MS: &str = "JVMKIT_POLL_INTERVAL_MS";
    /// JVM installation root; `<home>/bin/java` is preferred over PATH lookup.
    pub const JVMKIT_JAVA_HOME: &str = "JVMKIT_JAVA_HOME";
}

/// Read an environment variable, treating empty/whitespace values as unset.
pub fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|s| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

/// Parse a boolean environment variable: 0/false/no/off are false,
/// anything else set is true.
pub fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key).ok().as_deref() {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}

/// Parse an unsigned integer environment variable, falling back on
/// missing or unparseable values.
pub fn env_u64(key: &str, default: u64) -> u64 {
    env_optional(key)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Observability knobs: quiet mode for daemon/benchmark embedding.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| Self {
            quiet: env_bool(env_keys::JVMKIT_QUIET, false),
        })
    }
}

/// Process-execution tuning.
#[derive(Debug, Clone, Copy)]
pub struct ExecConfig {
    /// Sleep between child liveness polls in captured mode.
    pub poll_interval: Duration,
}

impl ExecConfig {
    pub fn from_env() -> Self {
        let ms = env_u64(env_keys::JVMKIT_POLL_INTERVAL_MS, 5).clamp(1, 1_000);
        Self {
            poll_interval: Duration::from_millis(ms),
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_bool_parses_falsy_values() {
        std::env::set_var("JVMKIT_TEST_BOOL", "off");
        assert!(!env_bool("JVMKIT_TEST_BOOL", true));
        std::env::set_var("JVMKIT_TEST_BOOL", "1");
        assert!(env_bool("JVMKIT_TEST_BOOL", false));
        std::env::remove_var("JVMKIT_TEST_BOOL");
        assert!(env_bool("JVMKIT_TEST_BOOL", true));
    }

    #[test]
    fn env_optional_treats_blank_as_unset() {
        std::env::set_var("JVMKIT_TEST_BLANK", "   ");
        assert_eq!(env_optional("JVMKIT_TEST_BLANK"), None);
        std::env::remove_var("JVMKIT_TEST_BLANK");
    }

    #[test]
    fn exec_config_clamps_poll_interval() {
        std::env::set_var(env_keys::JVMKIT_POLL_INTERVAL_MS, "0");
        assert_eq!(ExecConfig::from_env().poll_interval, Duration::from_millis(1));
        std::env::remove_var(env_keys::JVMKIT_POLL_INTERVAL_MS);
        assert_eq!(ExecConfig::from_env().poll_interval, Duration::from_millis(5));
    }
}
