//! Expected/actual warning extraction and reconciliation.

use regex::{Captures, Regex};

use attest_core::config::{ResolvedGeneral, ResolvedWarn};
use attest_core::results::{MismatchedPair, Warning, WarningMismatch};

fn group<'t>(caps: &Captures<'t>, idx: usize) -> Option<&'t str> {
    caps.get(idx).map(|m| m.as_str())
}

fn group_usize(caps: &Captures<'_>, idx: usize) -> Option<usize> {
    group(caps, idx).and_then(|s| s.parse().ok())
}

/// Extract expected warnings from a fixture's lines.
///
/// A marker annotates the source line that follows it. When the marker
/// text carries no line number, the target line is computed in the
/// tool's view of the file, where no marker lines exist: the next
/// line's one-based index minus the marker lines seen so far.
/// Middle/end patterns continue a multi-line message; continuation
/// lines are markers too and count toward the adjustment.
pub fn expected_warnings(
    general: &ResolvedGeneral,
    warn: &ResolvedWarn,
    lines: &[String],
) -> Vec<Warning> {
    let mut out = Vec::new();
    let mut markers_seen = 0usize;
    let mut i = 0usize;
    while i < lines.len() {
        let Some(caps) = general.expected_warnings_pattern.captures(&lines[i]) else {
            i += 1;
            continue;
        };
        markers_seen += 1;

        let declared_line = group_usize(&caps, warn.line_capture_group);
        let column = if warn.warning_text_has_column {
            group_usize(&caps, warn.column_capture_group)
        } else {
            None
        };
        let Some(first) = group(&caps, warn.message_capture_group) else {
            tracing::warn!(
                "expected-warning marker without message group {}: `{}`",
                warn.message_capture_group,
                lines[i]
            );
            i += 1;
            continue;
        };
        let mut message = first.to_string();

        // Consume continuation lines.
        while i + 1 < lines.len() {
            let next = &lines[i + 1];
            if let Some(end) = general
                .expected_warnings_end_pattern
                .as_ref()
                .and_then(|re| re.captures(next))
            {
                if let Some(part) = group(&end, warn.message_capture_group) {
                    message.push_str(&general.expected_warnings_separator);
                    message.push_str(part);
                }
                markers_seen += 1;
                i += 1;
                break;
            }
            let Some(mid) = general
                .expected_warnings_middle_pattern
                .as_ref()
                .and_then(|re| re.captures(next))
            else {
                break;
            };
            if let Some(part) = group(&mid, warn.message_capture_group) {
                message.push_str(&general.expected_warnings_separator);
                message.push_str(part);
            }
            markers_seen += 1;
            i += 1;
        }

        let line = if warn.warning_text_has_line {
            declared_line
        } else {
            // One-based index of the line after the marker block, in
            // the file as the tool sees it.
            Some(i + 2 - markers_seen)
        };
        out.push(Warning {
            file: None,
            line,
            column,
            message,
        });
        i += 1;
    }
    out
}

/// Extract actual warnings from the tool's combined output lines.
pub fn actual_warnings<'a>(
    warn: &ResolvedWarn,
    output: impl Iterator<Item = &'a str>,
) -> Vec<Warning> {
    output
        .filter_map(|line| warning_from_line(&warn.actual_warnings_pattern, warn, line))
        .collect()
}

fn warning_from_line(pattern: &Regex, warn: &ResolvedWarn, line: &str) -> Option<Warning> {
    let caps = pattern.captures(line)?;
    let message = group(&caps, warn.message_capture_group_out)?.to_string();
    Some(Warning {
        file: group(&caps, warn.file_name_capture_group_out).map(str::to_owned),
        line: if warn.warning_text_has_line {
            group_usize(&caps, warn.line_capture_group_out)
        } else {
            None
        },
        column: if warn.warning_text_has_column {
            group_usize(&caps, warn.column_capture_group_out)
        } else {
            None
        },
        message,
    })
}

/// Warnings attributable to one unit of a batch. A warning anchors to
/// the unit when its captured file name and the unit's file name agree
/// as path suffixes. Warnings with no file capture apply to every
/// unit; batching tools should capture file names.
pub fn warnings_for_unit(all: &[Warning], unit_file_name: &str) -> Vec<Warning> {
    all.iter()
        .filter(|w| match &w.file {
            None => true,
            Some(f) => f.ends_with(unit_file_name) || unit_file_name.ends_with(f.as_str()),
        })
        .cloned()
        .collect()
}

/// Pair expected and actual warnings by `(line, column)` position.
///
/// An expected warning prefers an actual with the same position and a
/// matching message; failing that, a same-position actual becomes a
/// mismatched pair; failing that, the expected warning is missing.
/// Actuals left unpaired are extra.
pub fn reconcile(
    expected: &[Warning],
    actual: &[Warning],
    warn: &ResolvedWarn,
) -> WarningMismatch {
    let mut unpaired: Vec<Warning> = actual.to_vec();
    let mut mismatch = WarningMismatch::default();

    for exp in expected {
        let full = unpaired
            .iter()
            .position(|a| same_position(exp, a) && message_matches(exp, a, warn.exact_warnings_match));
        if let Some(pos) = full {
            unpaired.remove(pos);
            continue;
        }
        if let Some(pos) = unpaired.iter().position(|a| same_position(exp, a)) {
            let actual = unpaired.remove(pos);
            mismatch.mismatched.push(MismatchedPair {
                expected: exp.clone(),
                actual,
            });
            continue;
        }
        mismatch.missing.push(exp.clone());
    }
    mismatch.extra = unpaired;
    mismatch
}

fn same_position(expected: &Warning, actual: &Warning) -> bool {
    expected.line == actual.line && expected.column == actual.column
}

fn message_matches(expected: &Warning, actual: &Warning, exact: bool) -> bool {
    if exact {
        actual.message == expected.message
    } else {
        actual.message.contains(&expected.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_core::config::{FixAndWarnConfig, GeneralConfig, WarnConfig};
    use attest_core::config::resolved::{ResolvedFixAndWarn, DEFAULT_EXPECTED_WARNINGS_PATTERN};
    use std::path::Path;

    fn general_with(overrides: GeneralConfig) -> ResolvedGeneral {
        GeneralConfig {
            exec_cmd: Some("analyzer".into()),
            tags: Some(vec!["all".into()]),
            description: Some("d".into()),
            suite_name: Some("s".into()),
            ..overrides
        }
        .validate_and_set_defaults(Path::new("attest.toml"))
        .unwrap()
    }

    fn warn_with(overrides: WarnConfig) -> ResolvedWarn {
        WarnConfig {
            actual_warnings_pattern: Some(r"(.+):(\d+):(\d+): (.+)".into()),
            ..overrides
        }
        .validate_and_set_defaults(Path::new("attest.toml"))
        .unwrap()
    }

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_owned).collect()
    }

    #[test]
    fn expected_extraction_reads_marker_groups() {
        let general = general_with(GeneralConfig::default());
        let warn = warn_with(WarnConfig::default());
        let src = lines(
            "package a;\n// ;warn:2:4: Class name in incorrect case\nclass example {}\n",
        );
        let expected = expected_warnings(&general, &warn, &src);
        assert_eq!(
            expected,
            vec![Warning {
                file: None,
                line: Some(2),
                column: Some(4),
                message: "Class name in incorrect case".into(),
            }]
        );
    }

    #[test]
    fn expected_line_computed_when_marker_has_no_line() {
        let general = general_with(GeneralConfig {
            expected_warnings_pattern: Some(r"// ;warn: (.+)".into()),
            ..GeneralConfig::default()
        });
        let warn = warn_with(WarnConfig {
            warning_text_has_line: Some(false),
            warning_text_has_column: Some(false),
            message_capture_group: Some(1),
            ..WarnConfig::default()
        });
        let src = lines(
            "line one\n// ;warn: first\nline two\n// ;warn: second\nline three\n",
        );
        let expected = expected_warnings(&general, &warn, &src);
        // Tool view: "line one" = 1, "line two" = 2, "line three" = 3.
        assert_eq!(expected[0].line, Some(2));
        assert_eq!(expected[1].line, Some(3));
        assert_eq!(expected[0].message, "first");
    }

    #[test]
    fn multi_line_messages_concatenate_with_separator() {
        let general = general_with(GeneralConfig {
            expected_warnings_middle_pattern: Some(r"// ;warn:\+: (.+)".into()),
            expected_warnings_end_pattern: Some(r"// ;warn:\$: (.+)".into()),
            expected_warnings_separator: Some(" ".into()),
            ..GeneralConfig::default()
        });
        let warn = warn_with(WarnConfig {
            warning_text_has_line: Some(false),
            warning_text_has_column: Some(false),
            message_capture_group: Some(1),
            ..WarnConfig::default()
        });
        // Override main pattern so groups line up with group 1.
        let general = ResolvedGeneral {
            expected_warnings_pattern: Regex::new(r"^// ;warn: (.+)").unwrap(),
            ..general
        };
        let src = lines(
            "// ;warn: first part\n// ;warn:+: middle part\n// ;warn:$: end part\nfn broken() {}\n",
        );
        let expected = expected_warnings(&general, &warn, &src);
        assert_eq!(expected.len(), 1);
        assert_eq!(expected[0].message, "first part middle part end part");
        // Three marker lines precede the annotated line.
        assert_eq!(expected[0].line, Some(1));
    }

    #[test]
    fn actual_extraction_uses_out_groups_and_anchors() {
        let warn = warn_with(WarnConfig::default());
        let output = [
            "src/Test1Test.java:2:4: Class name in incorrect case",
            "unrelated noise",
            "src/Test2Test.java:1:1: Missing header",
        ];
        let all = actual_warnings(&warn, output.into_iter());
        assert_eq!(all.len(), 2);

        let mine = warnings_for_unit(&all, "Test1Test.java");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].line, Some(2));
        assert_eq!(mine[0].message, "Class name in incorrect case");
    }

    #[test]
    fn reconcile_classifies_missing_extra_and_mismatched() {
        let warn = warn_with(WarnConfig::default());
        let exp = |line: usize, msg: &str| Warning {
            file: None,
            line: Some(line),
            column: Some(1),
            message: msg.into(),
        };
        let expected = vec![exp(1, "one"), exp(2, "two"), exp(3, "three")];
        let actual = vec![exp(1, "one"), exp(2, "not two"), exp(9, "surprise")];

        let m = reconcile(&expected, &actual, &warn);
        assert_eq!(m.missing, vec![exp(3, "three")]);
        assert_eq!(m.extra, vec![exp(9, "surprise")]);
        assert_eq!(m.mismatched.len(), 1);
        assert_eq!(m.mismatched[0].actual.message, "not two");
    }

    #[test]
    fn substring_match_when_exact_match_disabled() {
        let warn = warn_with(WarnConfig {
            exact_warnings_match: Some(false),
            ..WarnConfig::default()
        });
        let expected = vec![Warning {
            file: None,
            line: Some(1),
            column: Some(1),
            message: "incorrect case".into(),
        }];
        let actual = vec![Warning {
            file: None,
            line: Some(1),
            column: Some(1),
            message: "[RULE42] Class name in incorrect case (fix available)".into(),
        }];
        assert!(reconcile(&expected, &actual, &warn).is_empty());
    }

    #[test]
    fn default_marker_pattern_matches_documented_form() {
        let re = Regex::new(DEFAULT_EXPECTED_WARNINGS_PATTERN).unwrap();
        let caps = re.captures("// ;warn:2:4: Class name in incorrect case").unwrap();
        assert_eq!(&caps[1], "2");
        assert_eq!(&caps[2], "4");
        assert_eq!(&caps[3], "Class name in incorrect case");
    }

    #[test]
    fn fix_and_warn_defaults_resolve_together() {
        let config = FixAndWarnConfig {
            warn: WarnConfig {
                actual_warnings_pattern: Some(r"(.+):(\d+):(\d+): (.+)".into()),
                ..WarnConfig::default()
            },
            ..FixAndWarnConfig::default()
        };
        let resolved: ResolvedFixAndWarn = config
            .validate_and_set_defaults(Path::new("attest.toml"))
            .unwrap();
        assert_eq!(resolved.fix.resource_name_test, "Test");
        assert_eq!(resolved.fix.resource_name_expected, "Expected");
    }
}
