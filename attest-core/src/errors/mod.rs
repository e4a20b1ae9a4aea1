//! Error taxonomy for the attest engine.
//!
//! Split per layer: `ConfigError` is structural (fatal to its subtree),
//! `PluginError` is operational (fatal to its batch only).

pub mod config_error;
pub mod error_code;
pub mod plugin_error;

pub use config_error::ConfigError;
pub use error_code::AttestErrorCode;
pub use plugin_error::PluginError;
