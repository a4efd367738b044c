//! Persistence and data model for Modest projects
//!
//! A project is a tree of typed items. The tree's skeleton (ids, names,
//! structure) lives in one master XML document; each item's detail fields
//! live in `<project-dir>/<type>/<id>.xml`.

pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod paths;
pub mod project;
pub mod registry;
pub mod saver;
pub mod tree;
pub mod xml;

// Re-export commonly used types
pub use config::{get_config_path, Config};
pub use error::{IoOperation, ModestError, Result};
pub use loader::Loader;
pub use models::{FieldKind, FieldSpec, Item, ItemType};
pub use paths::{item_detail_path, item_type_dir};
pub use project::{Project, DEFAULT_TEMPLATE};
pub use registry::ItemRegistry;
pub use saver::{SaveReport, Saver};
pub use tree::{NodeId, TreeModel, TreeNode};
