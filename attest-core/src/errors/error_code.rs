//! Stable machine-readable error codes.
//!
//! External reporters key on these strings, so they must never change
//! once published.

pub const CONFIG_IO: &str = "CONFIG_IO";
pub const CONFIG_PARSE: &str = "CONFIG_PARSE";
pub const CONFIG_DECODE: &str = "CONFIG_DECODE";
pub const CONFIG_UNKNOWN_SECTION: &str = "CONFIG_UNKNOWN_SECTION";
pub const CONFIG_MISSING_FIELD: &str = "CONFIG_MISSING_FIELD";
pub const CONFIG_BAD_PATTERN: &str = "CONFIG_BAD_PATTERN";
pub const CONFIG_FIX_AND_WARN_MISMATCH: &str = "CONFIG_FIX_AND_WARN_MISMATCH";

pub const PROCESS_SPAWN: &str = "PROCESS_SPAWN";
pub const PROCESS_TIMEOUT: &str = "PROCESS_TIMEOUT";
pub const PROCESS_WAIT: &str = "PROCESS_WAIT";
pub const PLUGIN_IO: &str = "PLUGIN_IO";

/// Every attest error type exposes a stable code for machine consumption.
pub trait AttestErrorCode {
    fn error_code(&self) -> &'static str;
}
