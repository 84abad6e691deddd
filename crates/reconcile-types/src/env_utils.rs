//! Environment variable parsing utilities.
//!
//! Every configurable knob in the workspace (index endpoint, request
//! timeouts, poll policy, signer command) can be supplied through the
//! environment. These helpers keep the parsing uniform:
//!
//! ```ignore
//! std::env::var("VAR_NAME")
//!     .ok()
//!     .and_then(|v| v.parse::<u64>().ok())
//!     .unwrap_or(default_value)
//! ```
//!
//! # Example
//!
//! ```
//! use reconcile_types::env_utils::{env_first, env_var_or};
//!
//! let attempts: u32 = env_var_or("RECONCILE_POLL_ATTEMPTS", 8);
//! let endpoint = env_first(&["RECONCILE_INDEX_URL", "HELIUS_DAS", "SOLANA_RPC"]);
//! ```

use std::str::FromStr;

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse an environment variable with a default value.
///
/// Returns the default if the variable is not set or cannot be parsed.
///
/// ```
/// use reconcile_types::env_utils::env_var_or;
///
/// let timeout: u64 = env_var_or("RECONCILE_INDEX_TIMEOUT_SECS", 30);
/// ```
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Get an environment variable only if it is set to a non-blank value.
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Return the first non-blank value among several variables, in order.
///
/// Used where older tooling exported the same setting under different names
/// (`HELIUS_DAS`, `SOLANA_RPC`).
pub fn env_first(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| env_non_empty(key))
}
