//! Discovery and hierarchical resolution of `attest.toml` files.
//!
//! Every config file found under a root becomes a node whose parent is
//! the nearest ancestor directory's config. Nodes are stored in an
//! arena and reference each other by index; the tree is immutable after
//! discovery. Enumeration order (parent before children, children in
//! lexical path order) is load-bearing for reproducible reports and is
//! covered by regression tests.

use std::path::{Path, PathBuf};

use super::resolved::{ResolvedFix, ResolvedFixAndWarn, ResolvedGeneral, ResolvedWarn};
use super::schema::{
    FixAndWarnConfig, FixConfig, GeneralConfig, PluginConfig, SectionKind, WarnConfig,
};
use crate::errors::ConfigError;
use crate::fs::FileSystem;

/// File name of a configuration node.
pub const CONFIG_FILE_NAME: &str = "attest.toml";

/// Index of a node within its `ConfigTree`.
pub type NodeId = usize;

/// One discovered configuration file (or the synthesized empty root).
#[derive(Debug)]
pub struct ConfigNode {
    /// Path of the config file. The synthesized root points at the
    /// root directory's (absent) `attest.toml`.
    pub location: PathBuf,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Sections found in the file, at most one per kind.
    pub sections: Vec<PluginConfig>,
}

impl ConfigNode {
    /// Directory this node governs.
    pub fn directory(&self) -> &Path {
        self.location.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn section(&self, kind: SectionKind) -> Option<&PluginConfig> {
        self.sections.iter().find(|s| s.kind() == kind)
    }
}

/// Arena of config nodes; index 0 is the root.
#[derive(Debug)]
pub struct ConfigTree {
    nodes: Vec<ConfigNode>,
}

impl ConfigTree {
    /// Build a tree from a directory (recursive discovery) or from a
    /// single config file (its enclosing directory's subtree).
    pub fn from_path(fs: &dyn FileSystem, path: &Path) -> Result<Self, ConfigError> {
        let root_dir = if fs.is_file(path) {
            path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };

        let config_files = discover_config_files(&root_dir);
        tracing::debug!(
            "discovered {} config file(s) under `{}`",
            config_files.len(),
            root_dir.display()
        );

        let mut nodes: Vec<ConfigNode> = Vec::with_capacity(config_files.len() + 1);
        let root_location = root_dir.join(CONFIG_FILE_NAME);

        // Root node: the root directory's config if present, otherwise
        // a synthesized empty node so every other node has an ancestor.
        let root_sections = if config_files.first() == Some(&root_location) {
            parse_config_file(fs, &root_location)?
        } else {
            Vec::new()
        };
        nodes.push(ConfigNode {
            location: root_location.clone(),
            parent: None,
            children: Vec::new(),
            sections: root_sections,
        });

        // `config_files` is depth-sorted, so every parent directory's
        // config is processed before its descendants.
        for location in &config_files {
            if *location == root_location {
                continue;
            }
            let parent = nearest_ancestor(&nodes, location);
            let sections = parse_config_file(fs, location)?;
            let id = nodes.len();
            nodes.push(ConfigNode {
                location: location.clone(),
                parent: Some(parent),
                children: Vec::new(),
                sections,
            });
            nodes[parent].children.push(id);
        }

        // Children in lexical path order.
        let order: Vec<Vec<NodeId>> = nodes
            .iter()
            .map(|n| {
                let mut children = n.children.clone();
                children.sort_by(|a, b| nodes[*a].location.cmp(&nodes[*b].location));
                children
            })
            .collect();
        for (node, children) in nodes.iter_mut().zip(order) {
            node.children = children;
        }

        Ok(Self { nodes })
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &ConfigNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in depth-first preorder: parent before children,
    /// children in lexical path order. Deterministic per tree.
    pub fn all_test_configs(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            // Reverse so the lexically-first child is popped first.
            for child in self.nodes[id].children.iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    /// Merge the section of `kind` from `id` up to the root. Returns
    /// the merged raw record, or `None` if the kind never appears on
    /// the chain. Validation is the caller's single, separate step.
    pub fn effective_config(&self, id: NodeId, kind: SectionKind) -> Option<PluginConfig> {
        let mut merged: Option<PluginConfig> = None;
        let mut cur = Some(id);
        while let Some(n) = cur {
            if let Some(section) = self.nodes[n].section(kind) {
                merged = Some(match merged {
                    Some(m) => m.merge_with(section),
                    None => section.clone(),
                });
            }
            cur = self.nodes[n].parent;
        }
        merged
    }

    /// Effective `[general]` for a node, validated and defaulted.
    /// Every node has one: an absent section resolves from ancestors,
    /// and an entirely absent chain fails validation on required fields.
    pub fn resolved_general(&self, id: NodeId) -> Result<ResolvedGeneral, ConfigError> {
        let merged = match self.effective_config(id, SectionKind::General) {
            Some(PluginConfig::General(g)) => g,
            _ => GeneralConfig::default(),
        };
        merged.validate_and_set_defaults(&self.nodes[id].location)
    }

    /// Effective `[warn]` for a node, or `None` when no ancestor
    /// declares one.
    pub fn resolved_warn(&self, id: NodeId) -> Result<Option<ResolvedWarn>, ConfigError> {
        match self.effective_config(id, SectionKind::Warn) {
            Some(PluginConfig::Warn(w)) => {
                Ok(Some(w.validate_and_set_defaults(&self.nodes[id].location)?))
            }
            _ => Ok(None),
        }
    }

    /// Effective `[fix]` for a node, or `None`.
    pub fn resolved_fix(&self, id: NodeId) -> Result<Option<ResolvedFix>, ConfigError> {
        match self.effective_config(id, SectionKind::Fix) {
            Some(PluginConfig::Fix(f)) => {
                Ok(Some(f.validate_and_set_defaults(&self.nodes[id].location)?))
            }
            _ => Ok(None),
        }
    }

    /// Effective `["fix and warn"]` for a node, or `None`.
    pub fn resolved_fix_and_warn(
        &self,
        id: NodeId,
    ) -> Result<Option<ResolvedFixAndWarn>, ConfigError> {
        match self.effective_config(id, SectionKind::FixAndWarn) {
            Some(PluginConfig::FixAndWarn(fw)) => {
                Ok(Some(fw.validate_and_set_defaults(&self.nodes[id].location)?))
            }
            _ => Ok(None),
        }
    }

    /// Directories whose fixtures belong to `id`: the node's own
    /// directory and every descendant directory not governed by a child
    /// config. Sorted for deterministic discovery.
    pub fn resource_directories(&self, id: NodeId) -> Vec<PathBuf> {
        let node_dir = self.nodes[id].directory().to_path_buf();
        let child_dirs: Vec<PathBuf> = self.nodes[id]
            .children
            .iter()
            .map(|c| self.nodes[*c].directory().to_path_buf())
            .collect();

        let walker = ignore::WalkBuilder::new(&node_dir)
            .standard_filters(false)
            .hidden(true)
            .filter_entry(move |entry| {
                !child_dirs.iter().any(|d| entry.path().starts_with(d))
            })
            .build();

        let mut dirs: Vec<PathBuf> = walker
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.into_path())
            .collect();
        dirs.sort();
        dirs
    }
}

/// All `attest.toml` files under `root_dir`, sorted by path.
fn discover_config_files(root_dir: &Path) -> Vec<PathBuf> {
    let walker = ignore::WalkBuilder::new(root_dir)
        .standard_filters(false)
        .hidden(true)
        .build();

    let mut files: Vec<PathBuf> = walker
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| e.file_name() == std::ffi::OsStr::new(CONFIG_FILE_NAME))
        .map(|e| e.into_path())
        .collect();
    // Depth before path: every ancestor config must precede its
    // descendants, which plain lexical order does not guarantee (an
    // uppercase directory name sorts before `attest.toml`).
    files.sort_by_key(|p| (p.components().count(), p.clone()));
    files
}

/// Index of the node governing the nearest ancestor directory.
/// Falls back to the root node, which always exists.
fn nearest_ancestor(nodes: &[ConfigNode], location: &Path) -> NodeId {
    let mut best: NodeId = 0;
    let mut best_depth = 0;
    for (id, node) in nodes.iter().enumerate() {
        let dir = node.directory();
        if location.starts_with(dir) && location != node.location {
            let depth = dir.components().count();
            if depth >= best_depth {
                best = id;
                best_depth = depth;
            }
        }
    }
    best
}

/// Parse one config file into its section records. Unknown section
/// names are a hard error: a typo would otherwise silently disable a
/// plugin.
fn parse_config_file(
    fs: &dyn FileSystem,
    path: &Path,
) -> Result<Vec<PluginConfig>, ConfigError> {
    let text = fs.read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let table: toml::Table = text.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut sections = Vec::new();
    for (key, value) in table {
        let kind = SectionKind::from_table_name(&key).ok_or_else(|| {
            ConfigError::UnknownSection {
                path: path.to_path_buf(),
                section: key.clone(),
            }
        })?;
        sections.push(decode_section(path, kind, value)?);
    }
    Ok(sections)
}

fn decode_section(
    path: &Path,
    kind: SectionKind,
    value: toml::Value,
) -> Result<PluginConfig, ConfigError> {
    let decode_err = |e: toml::de::Error| ConfigError::Decode {
        path: path.to_path_buf(),
        section: kind.table_name().to_string(),
        message: e.to_string(),
    };
    Ok(match kind {
        SectionKind::General => {
            PluginConfig::General(value.try_into::<GeneralConfig>().map_err(decode_err)?)
        }
        SectionKind::Warn => PluginConfig::Warn(value.try_into::<WarnConfig>().map_err(decode_err)?),
        SectionKind::Fix => PluginConfig::Fix(value.try_into::<FixConfig>().map_err(decode_err)?),
        SectionKind::FixAndWarn => {
            PluginConfig::FixAndWarn(value.try_into::<FixAndWarnConfig>().map_err(decode_err)?)
        }
    })
}
