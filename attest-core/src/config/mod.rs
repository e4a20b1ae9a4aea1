//! Configuration: raw TOML records, hierarchical discovery, and
//! validated resolution.
//!
//! A config travels through three shapes. The raw records in
//! [`schema`] mirror the TOML sections field for field, everything
//! optional. [`tree`] discovers the files and merges each section up
//! the ancestor chain, child values winning. [`resolved`] then checks
//! required fields, fills defaults, and compiles patterns, producing
//! the owned records the plugins consume.

pub mod resolved;
pub mod schema;
pub mod tree;

pub use resolved::{ResolvedFix, ResolvedFixAndWarn, ResolvedGeneral, ResolvedWarn};
pub use schema::{
    FixAndWarnConfig, FixConfig, GeneralConfig, PluginConfig, SectionKind, WarnConfig,
};
pub use tree::{ConfigNode, ConfigTree, NodeId, CONFIG_FILE_NAME};
