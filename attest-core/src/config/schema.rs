//! Raw configuration section records and field-wise merge.
//!
//! Every field is optional on purpose: at merge time we cannot tell a
//! user-provided value from a default, so defaults are only applied
//! later, in the single validate-and-resolve pass (`resolved.rs`).

use serde::{Deserialize, Serialize};

/// The section kinds an `attest.toml` file may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SectionKind {
    General,
    Warn,
    Fix,
    FixAndWarn,
}

impl SectionKind {
    /// Map a top-level TOML table name onto a kind.
    pub fn from_table_name(name: &str) -> Option<Self> {
        match name {
            "general" => Some(Self::General),
            "warn" => Some(Self::Warn),
            "fix" => Some(Self::Fix),
            "fix and warn" => Some(Self::FixAndWarn),
            _ => None,
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Warn => "warn",
            Self::Fix => "fix",
            Self::FixAndWarn => "fix and warn",
        }
    }
}

/// `[general]` — suite-wide settings shared by all plugins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Command executed to check resources; file paths are appended.
    pub exec_cmd: Option<String>,
    /// Labels for grouping tests. Unioned across the config chain.
    pub tags: Option<Vec<String>>,
    pub description: Option<String>,
    pub suite_name: Option<String>,
    pub language: Option<String>,
    /// Tests excluded from the run, by literal name or regex.
    pub excluded_tests: Option<Vec<String>>,
    /// Regex matching inline expected-warning markers.
    pub expected_warnings_pattern: Option<String>,
    /// Continuation pattern for multi-line expected warnings.
    pub expected_warnings_middle_pattern: Option<String>,
    /// Terminator pattern for multi-line expected warnings.
    pub expected_warnings_end_pattern: Option<String>,
    /// Separator joining the pieces of a multi-line message.
    pub expected_warnings_separator: Option<String>,
    /// Regex matching inline `RUN:` command overrides.
    pub run_config_pattern: Option<String>,
    /// Command execution budget for one batch, in milliseconds.
    pub timeout_millis: Option<u64>,
}

impl GeneralConfig {
    /// Merge with the parent record: a set field on `self` wins, an
    /// unset field inherits; `tags` is unioned (child entries first).
    pub fn merge_with(&self, parent: &GeneralConfig) -> GeneralConfig {
        GeneralConfig {
            exec_cmd: or_clone(&self.exec_cmd, &parent.exec_cmd),
            tags: union_lists(&self.tags, &parent.tags),
            description: or_clone(&self.description, &parent.description),
            suite_name: or_clone(&self.suite_name, &parent.suite_name),
            language: or_clone(&self.language, &parent.language),
            excluded_tests: or_clone(&self.excluded_tests, &parent.excluded_tests),
            expected_warnings_pattern: or_clone(
                &self.expected_warnings_pattern,
                &parent.expected_warnings_pattern,
            ),
            expected_warnings_middle_pattern: or_clone(
                &self.expected_warnings_middle_pattern,
                &parent.expected_warnings_middle_pattern,
            ),
            expected_warnings_end_pattern: or_clone(
                &self.expected_warnings_end_pattern,
                &parent.expected_warnings_end_pattern,
            ),
            expected_warnings_separator: or_clone(
                &self.expected_warnings_separator,
                &parent.expected_warnings_separator,
            ),
            run_config_pattern: or_clone(&self.run_config_pattern, &parent.run_config_pattern),
            timeout_millis: self.timeout_millis.or(parent.timeout_millis),
        }
    }
}

/// `[warn]` — diagnostics comparison settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarnConfig {
    /// Extra flags inserted between the general command and the files.
    pub exec_flags: Option<String>,
    /// Regex applied to every captured output line.
    pub actual_warnings_pattern: Option<String>,
    /// Whether marker text carries an explicit line number.
    pub warning_text_has_line: Option<bool>,
    /// Whether marker text carries an explicit column number.
    pub warning_text_has_column: Option<bool>,
    /// Files per external-process invocation.
    pub batch_size: Option<usize>,
    /// Separator joining file paths in the command line.
    pub batch_separator: Option<String>,
    // Capture-group indices into `expected_warnings_pattern`.
    pub line_capture_group: Option<usize>,
    pub column_capture_group: Option<usize>,
    pub message_capture_group: Option<usize>,
    // Capture-group indices into `actual_warnings_pattern`. Positional
    // on purpose: different analyzers format diagnostics differently.
    pub file_name_capture_group_out: Option<usize>,
    pub line_capture_group_out: Option<usize>,
    pub column_capture_group_out: Option<usize>,
    pub message_capture_group_out: Option<usize>,
    /// Exact message equality (true) or substring containment (false).
    pub exact_warnings_match: Option<bool>,
    /// Whether unmatched expected warnings fail the unit.
    pub missing_warnings_fail: Option<bool>,
    /// Whether unmatched actual warnings fail the unit.
    pub extra_warnings_fail: Option<bool>,
    /// Regex identifying which files belong to this plugin.
    pub resource_name_pattern: Option<String>,
    /// Units whose path matches any of these are reported Ignored.
    pub ignore_lines_patterns: Option<Vec<String>>,
}

impl WarnConfig {
    pub fn merge_with(&self, parent: &WarnConfig) -> WarnConfig {
        WarnConfig {
            exec_flags: or_clone(&self.exec_flags, &parent.exec_flags),
            actual_warnings_pattern: or_clone(
                &self.actual_warnings_pattern,
                &parent.actual_warnings_pattern,
            ),
            warning_text_has_line: self.warning_text_has_line.or(parent.warning_text_has_line),
            warning_text_has_column: self
                .warning_text_has_column
                .or(parent.warning_text_has_column),
            batch_size: self.batch_size.or(parent.batch_size),
            batch_separator: or_clone(&self.batch_separator, &parent.batch_separator),
            line_capture_group: self.line_capture_group.or(parent.line_capture_group),
            column_capture_group: self.column_capture_group.or(parent.column_capture_group),
            message_capture_group: self.message_capture_group.or(parent.message_capture_group),
            file_name_capture_group_out: self
                .file_name_capture_group_out
                .or(parent.file_name_capture_group_out),
            line_capture_group_out: self
                .line_capture_group_out
                .or(parent.line_capture_group_out),
            column_capture_group_out: self
                .column_capture_group_out
                .or(parent.column_capture_group_out),
            message_capture_group_out: self
                .message_capture_group_out
                .or(parent.message_capture_group_out),
            exact_warnings_match: self.exact_warnings_match.or(parent.exact_warnings_match),
            missing_warnings_fail: self.missing_warnings_fail.or(parent.missing_warnings_fail),
            extra_warnings_fail: self.extra_warnings_fail.or(parent.extra_warnings_fail),
            resource_name_pattern: or_clone(
                &self.resource_name_pattern,
                &parent.resource_name_pattern,
            ),
            ignore_lines_patterns: union_lists(
                &self.ignore_lines_patterns,
                &parent.ignore_lines_patterns,
            ),
        }
    }
}

/// `[fix]` — fixed-source comparison settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixConfig {
    /// Extra flags inserted between the general command and the files.
    pub exec_flags: Option<String>,
    pub batch_size: Option<usize>,
    pub batch_separator: Option<String>,
    /// Stem suffix naming a "test" file (default `Test`).
    pub resource_name_test: Option<String>,
    /// Stem suffix naming the paired "expected" file (default `Expected`).
    pub resource_name_expected: Option<String>,
    /// Regex identifying which files belong to this plugin.
    pub resource_name_pattern: Option<String>,
    /// Units whose path matches any of these are reported Ignored.
    pub ignore_lines_patterns: Option<Vec<String>>,
}

impl FixConfig {
    pub fn merge_with(&self, parent: &FixConfig) -> FixConfig {
        FixConfig {
            exec_flags: or_clone(&self.exec_flags, &parent.exec_flags),
            batch_size: self.batch_size.or(parent.batch_size),
            batch_separator: or_clone(&self.batch_separator, &parent.batch_separator),
            resource_name_test: or_clone(&self.resource_name_test, &parent.resource_name_test),
            resource_name_expected: or_clone(
                &self.resource_name_expected,
                &parent.resource_name_expected,
            ),
            resource_name_pattern: or_clone(
                &self.resource_name_pattern,
                &parent.resource_name_pattern,
            ),
            ignore_lines_patterns: union_lists(
                &self.ignore_lines_patterns,
                &parent.ignore_lines_patterns,
            ),
        }
    }
}

/// `["fix and warn"]` — composite of a nested `fix` and `warn` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixAndWarnConfig {
    pub fix: FixConfig,
    pub warn: WarnConfig,
}

impl FixAndWarnConfig {
    pub fn merge_with(&self, parent: &FixAndWarnConfig) -> FixAndWarnConfig {
        FixAndWarnConfig {
            fix: self.fix.merge_with(&parent.fix),
            warn: self.warn.merge_with(&parent.warn),
        }
    }
}

/// Closed set of section records; one variant per `SectionKind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PluginConfig {
    General(GeneralConfig),
    Warn(WarnConfig),
    Fix(FixConfig),
    FixAndWarn(FixAndWarnConfig),
}

impl PluginConfig {
    pub fn kind(&self) -> SectionKind {
        match self {
            Self::General(_) => SectionKind::General,
            Self::Warn(_) => SectionKind::Warn,
            Self::Fix(_) => SectionKind::Fix,
            Self::FixAndWarn(_) => SectionKind::FixAndWarn,
        }
    }

    /// Same-variant merge; `self` is the child and wins field-wise.
    /// Mismatched variants keep the child unchanged (callers merge by
    /// kind, so this does not occur in practice).
    pub fn merge_with(&self, parent: &PluginConfig) -> PluginConfig {
        match (self, parent) {
            (Self::General(c), Self::General(p)) => Self::General(c.merge_with(p)),
            (Self::Warn(c), Self::Warn(p)) => Self::Warn(c.merge_with(p)),
            (Self::Fix(c), Self::Fix(p)) => Self::Fix(c.merge_with(p)),
            (Self::FixAndWarn(c), Self::FixAndWarn(p)) => Self::FixAndWarn(c.merge_with(p)),
            _ => self.clone(),
        }
    }
}

fn or_clone<T: Clone>(child: &Option<T>, parent: &Option<T>) -> Option<T> {
    child.clone().or_else(|| parent.clone())
}

/// Union of two optional lists, child entries first, duplicates dropped.
fn union_lists(child: &Option<Vec<String>>, parent: &Option<Vec<String>>) -> Option<Vec<String>> {
    match (child, parent) {
        (None, None) => None,
        (Some(c), None) => Some(c.clone()),
        (None, Some(p)) => Some(p.clone()),
        (Some(c), Some(p)) => {
            let mut merged = c.clone();
            for entry in p {
                if !merged.contains(entry) {
                    merged.push(entry.clone());
                }
            }
            Some(merged)
        }
    }
}
