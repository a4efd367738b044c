//! The editing session: one tree model plus the master path it belongs to

use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ModestError, Result};
use crate::loader::Loader;
use crate::models::{Item, ItemType};
use crate::registry::ItemRegistry;
use crate::saver::{SaveReport, Saver};
use crate::tree::{NodeId, TreeModel};

/// Template used for new projects when none is configured
pub const DEFAULT_TEMPLATE: &[u8] = include_bytes!("../templates/project.xml");

pub struct Project {
    /// Master document path; `None` until the project is first saved
    path: Option<PathBuf>,
    model: TreeModel,
    registry: ItemRegistry,
    loader: Loader,
    saver: Saver,
}

impl Project {
    /// Starts an unsaved project from a template master document
    ///
    /// Every item gets a fresh id, so the template can be reused.
    pub fn from_template(template: &[u8], saver: Saver) -> Result<Self> {
        let loader = Loader::default();
        let mut model = loader.load_skeleton_bytes(template, "<template>", true)?;
        // Fresh ids have no detail files behind them.
        for node in model.descendants(model.root()) {
            if let Some(item) = model.item_mut(node) {
                item.mark_hydrated();
            }
        }
        Ok(Self {
            path: None,
            model,
            registry: ItemRegistry::new(),
            loader,
            saver,
        })
    }

    /// Opens the skeleton of an existing project
    pub fn open<P: AsRef<Path>>(path: P, saver: Saver) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let loader = Loader::default();
        let model = loader.load_skeleton_file(&path, false)?;
        Ok(Self {
            path: Some(path),
            model,
            registry: ItemRegistry::new(),
            loader,
            saver,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn model(&self) -> &TreeModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut TreeModel {
        &mut self.model
    }

    pub fn root(&self) -> NodeId {
        self.model.root()
    }

    pub fn item(&self, node: NodeId) -> Option<&Item> {
        self.model.item(node)
    }

    pub fn find_by_item_id(&self, item_id: &str) -> Option<NodeId> {
        self.model.find_by_item_id(item_id)
    }

    pub fn list_creatable_types(&self) -> &'static [ItemType] {
        self.registry.list_types()
    }

    /// Appends a new item of `type_tag` under `parent`, or under the root
    pub fn add_item(&mut self, type_tag: &str, parent: Option<NodeId>) -> Result<NodeId> {
        let parent = parent.unwrap_or_else(|| self.model.root());
        let item_type = self
            .registry
            .creatable(type_tag)
            .ok_or_else(|| ModestError::UnknownItemType(type_tag.to_string()))?;

        let mut item = self
            .registry
            .create(item_type.default_name(), item_type.tag(), None)?;
        item.reset_id();
        while self.model.contains_item_id(item.id()) {
            item.reset_id();
        }
        item.mark_hydrated();

        let node = self.model.append(parent, item)?;
        log::debug!("Added {} {} under {}", item_type, node, parent);
        Ok(node)
    }

    /// Drops `node` and its subtree from the model; detail files stay on disk
    pub fn remove_item(&mut self, node: NodeId) -> Result<usize> {
        let removed = self.model.remove(node)?;
        log::debug!("Removed {} nodes at {}", removed, node);
        Ok(removed)
    }

    pub fn rename_item(&mut self, node: NodeId, name: &str) -> Result<()> {
        let item = self
            .model
            .item_mut(node)
            .ok_or(ModestError::UnknownNode(node.index()))?;
        item.name = name.to_string();
        Ok(())
    }

    pub fn set_field_value(&mut self, node: NodeId, key: &str, value: &str) -> Result<()> {
        self.model
            .item_mut(node)
            .ok_or(ModestError::UnknownNode(node.index()))?
            .set_field_value(key, value)
    }

    /// Loads the item's fields from its detail file
    ///
    /// Items that are already hydrated keep their in-memory values, and
    /// nothing happens while the project has no path.
    pub fn hydrate_fields(&mut self, node: NodeId) -> Result<&Item> {
        let item = self
            .model
            .item_mut(node)
            .ok_or(ModestError::UnknownNode(node.index()))?;
        if !item.is_hydrated() {
            self.loader.hydrate_fields(self.path.as_deref(), item)?;
        }
        Ok(&*item)
    }

    /// Hydrates every item, e.g. before handing the tree to an exporter
    pub fn hydrate_all(&mut self) -> Result<()> {
        for node in self.model.descendants(self.model.root()) {
            self.hydrate_fields(node)?;
        }
        Ok(())
    }

    /// Saves to the current path
    pub fn save(&mut self) -> Result<SaveReport> {
        let path = self.path.clone().ok_or(ModestError::NoProjectPath)?;
        self.saver.save(&self.model, &path)
    }

    /// Saves under a new master path and makes it the current one
    ///
    /// Field values still on disk at the old location are pulled into
    /// memory first so they move along with the project. Items without a
    /// detail file are skipped; a detail file that cannot be parsed fails
    /// the save before anything is written.
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<SaveReport> {
        let path = path.as_ref().to_path_buf();
        if self.path.as_ref().is_some_and(|current| *current != path) {
            for node in self.model.descendants(self.model.root()) {
                match self.hydrate_fields(node) {
                    Ok(_) => {}
                    Err(ModestError::Io { source, .. })
                        if source.kind() == io::ErrorKind::NotFound =>
                    {
                        log::debug!("No detail file to carry over for {}", node);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        let report = self.saver.save(&self.model, &path)?;
        self.path = Some(path);
        Ok(report)
    }
}
