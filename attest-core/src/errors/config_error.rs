//! Configuration-layer errors.
//!
//! These are structural: a `ConfigError` aborts the config subtree it
//! originates from, but must never abort sibling subtrees.

use std::path::PathBuf;

use super::error_code::{self, AttestErrorCode};

/// Errors raised while discovering, parsing, merging, or validating
/// `attest.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("failed to parse `{}` as TOML: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("failed to decode [{section}] section of `{}`: {message}", .path.display())]
    Decode {
        path: PathBuf,
        section: String,
        message: String,
    },

    #[error(
        "unknown section [{section}] in `{}` (valid sections: general, warn, fix, \"fix and warn\")",
        .path.display()
    )]
    UnknownSection { path: PathBuf, section: String },

    #[error(
        "missing required field `{field}` in [{section}] section of `{}`; provide it there or in a parent config",
        .location.display()
    )]
    MissingField {
        location: PathBuf,
        section: String,
        field: String,
    },

    #[error("invalid regex `{pattern}` for `{field}` in `{}`: {message}", .location.display())]
    BadPattern {
        location: PathBuf,
        field: String,
        pattern: String,
        message: String,
    },

    #[error(
        "[fix and warn] in `{}`: fix and warn batch sizes must match and fix test names must match the warn resource pattern (fix: {fix_detail}, warn: {warn_detail})",
        .location.display()
    )]
    FixAndWarnMismatch {
        location: PathBuf,
        fix_detail: String,
        warn_detail: String,
    },
}

impl AttestErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => error_code::CONFIG_IO,
            Self::Parse { .. } => error_code::CONFIG_PARSE,
            Self::Decode { .. } => error_code::CONFIG_DECODE,
            Self::UnknownSection { .. } => error_code::CONFIG_UNKNOWN_SECTION,
            Self::MissingField { .. } => error_code::CONFIG_MISSING_FIELD,
            Self::BadPattern { .. } => error_code::CONFIG_BAD_PATTERN,
            Self::FixAndWarnMismatch { .. } => error_code::CONFIG_FIX_AND_WARN_MISMATCH,
        }
    }
}
