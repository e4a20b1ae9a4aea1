//! The contract shared by all plugins: discovery of test units,
//! batching, and command construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use rustc_hash::FxHashSet;

use attest_core::config::{ResolvedGeneral, CONFIG_FILE_NAME};
use attest_core::fs::FileSystem;
use attest_core::results::{TestResult, TestUnit};

/// Everything a plugin needs besides its own section config.
#[derive(Clone)]
pub struct PluginContext {
    pub fs: Arc<dyn FileSystem>,
    pub general: ResolvedGeneral,
    /// Directories owned by the config node, deepest subtrees excluded
    /// where a child config takes over. Sorted.
    pub resource_dirs: Vec<PathBuf>,
    /// Pre-filtered candidate files. Empty means full discovery over
    /// `resource_dirs`.
    pub candidates: Vec<PathBuf>,
}

impl PluginContext {
    pub fn new(fs: Arc<dyn FileSystem>, general: ResolvedGeneral, resource_dirs: Vec<PathBuf>) -> Self {
        Self {
            fs,
            general,
            resource_dirs,
            candidates: Vec::new(),
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.general.timeout_millis)
    }

    /// Files eligible for this plugin, sorted. Candidates are taken
    /// as-is (they were filtered by whoever supplied them); full
    /// discovery applies the resource name pattern. `excluded_tests`
    /// applies either way.
    pub fn candidate_files(&self, resource_name_pattern: &Regex) -> Vec<PathBuf> {
        let excluded = ExcludedMatcher::new(&self.general.excluded_tests);
        let mut files: Vec<PathBuf> = if self.candidates.is_empty() {
            self.resource_dirs
                .iter()
                .flat_map(|dir| self.fs.list_directory(dir).unwrap_or_default())
                .filter(|p| self.fs.is_file(p))
                .filter(|p| file_name_matches(p, resource_name_pattern))
                .collect()
        } else {
            self.candidates.clone()
        };
        files.retain(|p| {
            file_name(p) != CONFIG_FILE_NAME && !excluded.matches(p)
        });
        files.sort();
        files.dedup();
        files
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

fn file_name_matches(path: &Path, pattern: &Regex) -> bool {
    pattern.is_match(file_name(path))
}

/// Matcher for `excluded_tests`: each entry is either a literal
/// file name / relative path suffix, or a regex over file names.
struct ExcludedMatcher {
    literals: FxHashSet<String>,
    patterns: Vec<Regex>,
}

impl ExcludedMatcher {
    fn new(entries: &[String]) -> Self {
        let mut literals = FxHashSet::default();
        let mut patterns = Vec::new();
        for entry in entries {
            literals.insert(entry.clone());
            if let Ok(re) = Regex::new(entry) {
                patterns.push(re);
            }
        }
        Self { literals, patterns }
    }

    fn matches(&self, path: &Path) -> bool {
        let name = file_name(path);
        if self.literals.contains(name) {
            return true;
        }
        if self
            .literals
            .iter()
            .any(|l| path.ends_with(Path::new(l.as_str())))
        {
            return true;
        }
        self.patterns.iter().any(|re| re.is_match(name))
    }
}

/// Inline override parsed from a fixture's run-config line,
/// e.g. `// RUN: args1=--strict,args2=--fast`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraFlags {
    /// Inserted between the command and the file list.
    pub args1: String,
    /// Appended after the file list.
    pub args2: String,
}

impl ExtraFlags {
    pub fn parse(text: &str) -> Self {
        let mut flags = Self::default();
        for part in text.split(',') {
            match part.split_once('=') {
                Some(("args1", v)) => flags.args1 = v.trim().to_string(),
                Some(("args2", v)) => flags.args2 = v.trim().to_string(),
                _ => {}
            }
        }
        flags
    }

    /// First run-config line found in the fixture, or the default.
    pub fn from_fixture(fs: &dyn FileSystem, general: &ResolvedGeneral, path: &Path) -> Self {
        let Ok(lines) = fs.read_lines(path) else {
            return Self::default();
        };
        lines
            .iter()
            .find_map(|line| general.run_config_pattern.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| Self::parse(m.as_str()))
            .unwrap_or_default()
    }
}

/// Shell command for one batch: command, pre-flags, the file list
/// joined by the batch separator, post-flags. Empty pieces are skipped.
pub fn build_command(
    exec_cmd: &str,
    exec_flags: &str,
    extra: &ExtraFlags,
    files: &[PathBuf],
    separator: &str,
) -> String {
    let file_list = files
        .iter()
        .map(|f| f.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(separator);

    [exec_cmd, &extra.args1, exec_flags, &file_list, &extra.args2]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Chunks an iterator into `Vec`s of at most `size` elements.
pub struct Batches<I: Iterator> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Batches<I> {
    pub fn new(inner: I, size: usize) -> Self {
        Self {
            inner,
            size: size.max(1),
        }
    }
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<_> = self.inner.by_ref().take(self.size).collect();
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

/// Discovery output: executable units plus results for units that
/// failed discovery (for example a fix test with no expected partner).
#[derive(Debug, Default)]
pub struct Discovery {
    pub units: Vec<TestUnit>,
    pub undiscoverable: Vec<TestResult>,
}

/// One plugin run over one config node.
pub trait Plugin {
    /// Enumerate units deterministically. Never touches processes.
    fn discover(&self) -> Discovery;

    /// Discover, then execute batch by batch. Lazy: a batch's process
    /// only runs when its results are pulled.
    fn execute(&self) -> Box<dyn Iterator<Item = TestResult> + '_>;
}
