//! The validate-and-set-defaults pass.
//!
//! Runs exactly once, on the fully merged record for a node. Required
//! fields with no safe default fail here; everything else is filled with
//! its documented default and regexes are compiled.

use std::path::Path;

use regex::Regex;

use super::schema::{FixAndWarnConfig, FixConfig, GeneralConfig, SectionKind, WarnConfig};
use crate::errors::ConfigError;

/// Default inline expected-warning marker, e.g.
/// `// ;warn:2:4: Class name in incorrect case`.
pub const DEFAULT_EXPECTED_WARNINGS_PATTERN: &str = r"// ;warn:(\d+):(\d+): (.+)";

/// Default inline run-config override, e.g. `// RUN: args1=-Xlint`.
pub const DEFAULT_RUN_CONFIG_PATTERN: &str = "// RUN: (.+)";

pub const DEFAULT_TIMEOUT_MILLIS: u64 = 10_000;

/// Default regex identifying test fixtures, e.g. `Test1Test.java`.
pub const DEFAULT_RESOURCE_NAME_PATTERN: &str = r".*Test\.\w+";

pub const DEFAULT_BATCH_SIZE: usize = 1;
pub const DEFAULT_BATCH_SEPARATOR: &str = " ";
pub const DEFAULT_RESOURCE_NAME_TEST: &str = "Test";
pub const DEFAULT_RESOURCE_NAME_EXPECTED: &str = "Expected";

/// Fully resolved `[general]` section.
#[derive(Debug, Clone)]
pub struct ResolvedGeneral {
    pub exec_cmd: String,
    pub tags: Vec<String>,
    pub description: String,
    pub suite_name: String,
    pub language: Option<String>,
    pub excluded_tests: Vec<String>,
    pub expected_warnings_pattern: Regex,
    pub expected_warnings_middle_pattern: Option<Regex>,
    pub expected_warnings_end_pattern: Option<Regex>,
    pub expected_warnings_separator: String,
    pub run_config_pattern: Regex,
    pub timeout_millis: u64,
}

/// Fully resolved `[warn]` section.
#[derive(Debug, Clone)]
pub struct ResolvedWarn {
    pub exec_flags: String,
    pub actual_warnings_pattern: Regex,
    pub warning_text_has_line: bool,
    pub warning_text_has_column: bool,
    pub batch_size: usize,
    pub batch_separator: String,
    pub line_capture_group: usize,
    pub column_capture_group: usize,
    pub message_capture_group: usize,
    pub file_name_capture_group_out: usize,
    pub line_capture_group_out: usize,
    pub column_capture_group_out: usize,
    pub message_capture_group_out: usize,
    pub exact_warnings_match: bool,
    pub missing_warnings_fail: bool,
    pub extra_warnings_fail: bool,
    pub resource_name_pattern: Regex,
    pub ignore_lines_patterns: Vec<Regex>,
}

/// Fully resolved `[fix]` section.
#[derive(Debug, Clone)]
pub struct ResolvedFix {
    pub exec_flags: String,
    pub batch_size: usize,
    pub batch_separator: String,
    pub resource_name_test: String,
    pub resource_name_expected: String,
    pub resource_name_pattern: Regex,
    pub ignore_lines_patterns: Vec<Regex>,
}

/// Fully resolved `["fix and warn"]` section.
#[derive(Debug, Clone)]
pub struct ResolvedFixAndWarn {
    pub fix: ResolvedFix,
    pub warn: ResolvedWarn,
}

impl GeneralConfig {
    /// Validate the merged record and fill defaults.
    ///
    /// `exec_cmd`, `tags`, `description`, and `suite_name` have no safe
    /// default: they describe the suite itself and must come from this
    /// config or one of its parents.
    pub fn validate_and_set_defaults(
        &self,
        location: &Path,
    ) -> Result<ResolvedGeneral, ConfigError> {
        let section = SectionKind::General.table_name();
        Ok(ResolvedGeneral {
            exec_cmd: require(self.exec_cmd.clone(), location, section, "exec_cmd")?,
            tags: require(self.tags.clone(), location, section, "tags")?,
            description: require(self.description.clone(), location, section, "description")?,
            suite_name: require(self.suite_name.clone(), location, section, "suite_name")?,
            language: self.language.clone(),
            excluded_tests: self.excluded_tests.clone().unwrap_or_default(),
            expected_warnings_pattern: compile(
                self.expected_warnings_pattern
                    .as_deref()
                    .unwrap_or(DEFAULT_EXPECTED_WARNINGS_PATTERN),
                location,
                "expected_warnings_pattern",
            )?,
            expected_warnings_middle_pattern: compile_opt(
                self.expected_warnings_middle_pattern.as_deref(),
                location,
                "expected_warnings_middle_pattern",
            )?,
            expected_warnings_end_pattern: compile_opt(
                self.expected_warnings_end_pattern.as_deref(),
                location,
                "expected_warnings_end_pattern",
            )?,
            expected_warnings_separator: self
                .expected_warnings_separator
                .clone()
                .unwrap_or_else(|| " ".to_string()),
            run_config_pattern: compile(
                self.run_config_pattern
                    .as_deref()
                    .unwrap_or(DEFAULT_RUN_CONFIG_PATTERN),
                location,
                "run_config_pattern",
            )?,
            timeout_millis: self.timeout_millis.unwrap_or(DEFAULT_TIMEOUT_MILLIS),
        })
    }
}

impl WarnConfig {
    pub fn validate_and_set_defaults(&self, location: &Path) -> Result<ResolvedWarn, ConfigError> {
        let section = SectionKind::Warn.table_name();
        let actual_pattern = require(
            self.actual_warnings_pattern.clone(),
            location,
            section,
            "actual_warnings_pattern",
        )?;
        Ok(ResolvedWarn {
            exec_flags: self.exec_flags.clone().unwrap_or_default(),
            actual_warnings_pattern: compile(&actual_pattern, location, "actual_warnings_pattern")?,
            warning_text_has_line: self.warning_text_has_line.unwrap_or(true),
            warning_text_has_column: self.warning_text_has_column.unwrap_or(true),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1),
            batch_separator: self
                .batch_separator
                .clone()
                .unwrap_or_else(|| DEFAULT_BATCH_SEPARATOR.to_string()),
            line_capture_group: self.line_capture_group.unwrap_or(1),
            column_capture_group: self.column_capture_group.unwrap_or(2),
            message_capture_group: self.message_capture_group.unwrap_or(3),
            file_name_capture_group_out: self.file_name_capture_group_out.unwrap_or(1),
            line_capture_group_out: self.line_capture_group_out.unwrap_or(2),
            column_capture_group_out: self.column_capture_group_out.unwrap_or(3),
            message_capture_group_out: self.message_capture_group_out.unwrap_or(4),
            exact_warnings_match: self.exact_warnings_match.unwrap_or(true),
            missing_warnings_fail: self.missing_warnings_fail.unwrap_or(true),
            extra_warnings_fail: self.extra_warnings_fail.unwrap_or(true),
            resource_name_pattern: compile(
                self.resource_name_pattern
                    .as_deref()
                    .unwrap_or(DEFAULT_RESOURCE_NAME_PATTERN),
                location,
                "resource_name_pattern",
            )?,
            ignore_lines_patterns: compile_list(
                self.ignore_lines_patterns.as_deref().unwrap_or_default(),
                location,
                "ignore_lines_patterns",
            )?,
        })
    }
}

impl FixConfig {
    pub fn validate_and_set_defaults(&self, location: &Path) -> Result<ResolvedFix, ConfigError> {
        Ok(ResolvedFix {
            exec_flags: self.exec_flags.clone().unwrap_or_default(),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1),
            batch_separator: self
                .batch_separator
                .clone()
                .unwrap_or_else(|| DEFAULT_BATCH_SEPARATOR.to_string()),
            resource_name_test: self
                .resource_name_test
                .clone()
                .unwrap_or_else(|| DEFAULT_RESOURCE_NAME_TEST.to_string()),
            resource_name_expected: self
                .resource_name_expected
                .clone()
                .unwrap_or_else(|| DEFAULT_RESOURCE_NAME_EXPECTED.to_string()),
            resource_name_pattern: compile(
                self.resource_name_pattern
                    .as_deref()
                    .unwrap_or(DEFAULT_RESOURCE_NAME_PATTERN),
                location,
                "resource_name_pattern",
            )?,
            ignore_lines_patterns: compile_list(
                self.ignore_lines_patterns.as_deref().unwrap_or_default(),
                location,
                "ignore_lines_patterns",
            )?,
        })
    }
}

impl FixAndWarnConfig {
    /// Validate both halves, then enforce the cross-section invariants:
    /// equal batch sizes, and fix test names visible to warn's resource
    /// pattern. Both are checked before any process is spawned.
    pub fn validate_and_set_defaults(
        &self,
        location: &Path,
    ) -> Result<ResolvedFixAndWarn, ConfigError> {
        let fix = self.fix.validate_and_set_defaults(location)?;
        let warn = self.warn.validate_and_set_defaults(location)?;

        // Warn must be able to see the files fix produces: either the
        // test suffix itself matches warn's pattern, or the pattern
        // text mentions it.
        let name_compatible = warn.resource_name_pattern.is_match(&fix.resource_name_test)
            || warn
                .resource_name_pattern
                .as_str()
                .contains(&fix.resource_name_test);
        if fix.batch_size != warn.batch_size || !name_compatible {
            return Err(ConfigError::FixAndWarnMismatch {
                location: location.to_path_buf(),
                fix_detail: format!(
                    "{{{}, batch_size={}}}",
                    fix.resource_name_test, fix.batch_size
                ),
                warn_detail: format!(
                    "{{{}, batch_size={}}}",
                    warn.resource_name_pattern, warn.batch_size
                ),
            });
        }
        Ok(ResolvedFixAndWarn { fix, warn })
    }
}

fn require<T>(
    value: Option<T>,
    location: &Path,
    section: &str,
    field: &str,
) -> Result<T, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingField {
        location: location.to_path_buf(),
        section: section.to_string(),
        field: field.to_string(),
    })
}

fn compile(pattern: &str, location: &Path, field: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::BadPattern {
        location: location.to_path_buf(),
        field: field.to_string(),
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn compile_opt(
    pattern: Option<&str>,
    location: &Path,
    field: &str,
) -> Result<Option<Regex>, ConfigError> {
    pattern.map(|p| compile(p, location, field)).transpose()
}

fn compile_list(
    patterns: &[String],
    location: &Path,
    field: &str,
) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| compile(p, location, field))
        .collect()
}
