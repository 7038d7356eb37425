//! Environment-variable configuration shared by every process in the IPC
//! mesh. Each binary keeps its own config struct; the helpers here do the
//! repetitive read-with-fallback work so defaults live in one idiom.

use std::env;
use std::str::FromStr;

/// Deployment flavor, selected by the ENVIRONMENT variable.
///
/// Development gets pretty ANSI logs for a human at a shell, production
/// gets JSON for a collector; nothing else in the system branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Anything but "production"/"prod" (case-insensitive) is development,
    /// so a bare shell always gets readable logs.
    pub fn from_env() -> Self {
        let value = env::var("ENVIRONMENT").unwrap_or_default();
        if value.eq_ignore_ascii_case("production") || value.eq_ignore_ascii_case("prod") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

/// Read an environment variable, falling back to `default` when unset.
pub fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable, falling back to `default` when
/// it is unset or does not parse.
pub fn var_parse_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
