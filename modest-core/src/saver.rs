//! Writes a tree model back to disk: one master document plus one detail
//! file per item.
//!
//! The save is not transactional. An error stops the walk; detail files
//! written before the failure stay on disk and the master document is only
//! written once every detail file succeeded.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IoOperation, ModestError, Result};
use crate::loader::Loader;
use crate::models::{Item, ItemType};
use crate::paths::{item_detail_path, item_type_dir, project_dir, DETAIL_EXTENSION};
use crate::tree::{NodeId, TreeModel};
use crate::xml::{self, Element};

/// Outcome of a successful save
#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    /// Number of detail files written, root included
    pub items_written: usize,
    /// Orphaned detail files deleted after the save
    pub orphans_removed: Vec<PathBuf>,
}

pub struct Saver {
    app_version: String,
    prune_orphans: bool,
    loader: Loader,
}

impl Saver {
    pub fn new(app_version: impl Into<String>) -> Self {
        Self {
            app_version: app_version.into(),
            prune_orphans: false,
            loader: Loader::default(),
        }
    }

    /// Delete detail files of items no longer in the tree after each save
    pub fn with_prune_orphans(mut self, prune_orphans: bool) -> Self {
        self.prune_orphans = prune_orphans;
        self
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Saves `model` with its master document at `master_path`
    pub fn save(&self, model: &TreeModel, master_path: &Path) -> Result<SaveReport> {
        let mut report = SaveReport::default();
        let root = self.save_node(model, model.root(), master_path, &mut report)?;

        let bytes = xml::to_pretty_bytes(&root)
            .map_err(|e| ModestError::io(IoOperation::Write, master_path, e))?;
        fs::write(master_path, bytes)
            .map_err(|e| ModestError::io(IoOperation::Write, master_path, e))?;
        log::info!(
            "Saved {} items to {}",
            report.items_written,
            master_path.display()
        );

        if self.prune_orphans {
            for orphan in self.orphaned_detail_files(model, master_path)? {
                fs::remove_file(&orphan)
                    .map_err(|e| ModestError::io(IoOperation::Remove, &orphan, e))?;
                log::info!("Removed orphaned detail file {}", orphan.display());
                report.orphans_removed.push(orphan);
            }
        }
        Ok(report)
    }

    /// Pre-order walk: writes the node's detail file, then builds its master
    /// element with the children's elements appended in tree order.
    fn save_node(
        &self,
        model: &TreeModel,
        node: NodeId,
        master_path: &Path,
        report: &mut SaveReport,
    ) -> Result<Element> {
        let item = model
            .item(node)
            .ok_or(ModestError::UnknownNode(node.index()))?;
        self.write_detail_file(item, master_path)?;
        report.items_written += 1;

        let mut element = identity_element(item);
        if item.is_root() {
            element.set_attribute("appVersion", &self.app_version);
        }
        element.push(Element::with_text("name", &item.name));
        for child in model.children(node) {
            element.push(self.save_node(model, *child, master_path, report)?);
        }
        Ok(element)
    }

    fn write_detail_file(&self, item: &Item, master_path: &Path) -> Result<()> {
        let dir = item_type_dir(master_path, item);
        fs::create_dir_all(&dir).map_err(|e| ModestError::io(IoOperation::CreateDir, &dir, e))?;

        let path = item_detail_path(master_path, item);
        let on_disk = if item.is_hydrated() {
            Vec::new()
        } else {
            self.existing_field_values(&path, item)?
        };

        let mut element = identity_element(item);
        element.push(Element::with_text("name", &item.name));
        for field in item.field_schema() {
            let value = item
                .stored_field_value(field.key)
                .or_else(|| {
                    on_disk
                        .iter()
                        .find(|(key, _)| *key == field.key)
                        .map(|(_, value)| value.as_str())
                })
                .unwrap_or("");
            element.push(Element::with_text(field.key, value));
        }

        let bytes =
            xml::to_pretty_bytes(&element).map_err(|e| ModestError::io(IoOperation::Write, &path, e))?;
        fs::write(&path, bytes).map_err(|e| ModestError::io(IoOperation::Write, &path, e))?;
        log::debug!("Wrote detail file {}", path.display());
        Ok(())
    }

    /// Values of a never-hydrated item that must survive the rewrite
    ///
    /// A detail file that exists but cannot be read fails the save, leaving
    /// the file untouched.
    fn existing_field_values(&self, path: &Path, item: &Item) -> Result<Vec<(&'static str, String)>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        self.loader.read_field_values(path, item).map_err(|e| {
            log::warn!("Not overwriting unreadable detail file {}", path.display());
            e
        })
    }

    /// Detail files in the project's type-bucket directories whose item is
    /// not part of `model`, sorted by path
    pub fn orphaned_detail_files(&self, model: &TreeModel, master_path: &Path) -> Result<Vec<PathBuf>> {
        let live: HashSet<(ItemType, &str)> = model
            .iter()
            .filter_map(|n| model.item(n))
            .map(|item| (item.item_type(), item.id()))
            .collect();

        let mut orphans = Vec::new();
        for item_type in ItemType::ALL {
            let dir = project_dir(master_path).join(item_type.tag());
            if !dir.is_dir() {
                continue;
            }
            let entries =
                fs::read_dir(&dir).map_err(|e| ModestError::io(IoOperation::ListDir, &dir, e))?;
            for entry in entries {
                let path = entry
                    .map_err(|e| ModestError::io(IoOperation::ListDir, &dir, e))?
                    .path();
                if !path.is_file()
                    || path.extension().and_then(|e| e.to_str()) != Some(DETAIL_EXTENSION)
                {
                    continue;
                }
                let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if !live.contains(&(item_type, id)) {
                    orphans.push(path.clone());
                }
            }
        }
        orphans.sort();
        Ok(orphans)
    }
}

fn identity_element(item: &Item) -> Element {
    let mut element = Element::new(item.item_type().tag());
    element.set_attribute("id", item.id());
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ItemRegistry;
    use tempfile::TempDir;

    fn item(tag: &str, name: &str, id: &str) -> Item {
        ItemRegistry::new().create(name, tag, Some(id)).unwrap()
    }

    fn scenario_model() -> TreeModel {
        let mut model = TreeModel::new(item("root", "Proj", "r1"));
        let root = model.root();
        let g1 = model.append(root, item("goal", "Ship it", "g1")).unwrap();
        model.append(g1, item("funcRequirement", "Deploy", "f1")).unwrap();
        model.append(root, item("section", "Intro", "s1")).unwrap();
        model
    }

    #[test]
    fn test_master_document_layout() {
        let temp_dir = TempDir::new().unwrap();
        let master = temp_dir.path().join("project.xml");
        let report = Saver::new("1.0.0").save(&scenario_model(), &master).unwrap();
        assert_eq!(report.items_written, 4);

        let text = fs::read_to_string(&master).unwrap();
        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
            <root id=\"r1\" appVersion=\"1.0.0\">\n    \
            <name>Proj</name>\n    \
            <goal id=\"g1\">\n        \
            <name>Ship it</name>\n        \
            <funcRequirement id=\"f1\">\n            \
            <name>Deploy</name>\n        \
            </funcRequirement>\n    \
            </goal>\n    \
            <section id=\"s1\">\n        \
            <name>Intro</name>\n    \
            </section>\n\
            </root>\n";
        assert_eq!(text, expected);
        assert_eq!(text.matches("appVersion").count(), 1);
    }

    #[test]
    fn test_detail_file_per_node() {
        let temp_dir = TempDir::new().unwrap();
        let master = temp_dir.path().join("project.xml");
        Saver::new("1.0.0").save(&scenario_model(), &master).unwrap();

        for rel in ["root/r1.xml", "goal/g1.xml", "funcRequirement/f1.xml", "section/s1.xml"] {
            assert!(temp_dir.path().join(rel).is_file(), "{rel} missing");
        }
        let goal = fs::read_to_string(temp_dir.path().join("goal/g1.xml")).unwrap();
        assert_eq!(
            goal,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <goal id=\"g1\">\n    \
             <name>Ship it</name>\n    \
             <description/>\n\
             </goal>\n"
        );
        assert!(!goal.contains("appVersion"));
    }

    #[test]
    fn test_field_values_are_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let master = temp_dir.path().join("project.xml");
        let mut model = scenario_model();
        let f1 = model.find_by_item_id("f1").unwrap();
        {
            let req = model.item_mut(f1).unwrap();
            req.set_field_value("description", "Push to prod\nsafely").unwrap();
            req.set_field_value("acceptanceCriteria", "Green & deployed").unwrap();
            req.mark_hydrated();
        }
        Saver::new("1.0.0").save(&model, &master).unwrap();

        let mut reread = item("funcRequirement", "Deploy", "f1");
        Loader::default().hydrate_fields(Some(&master), &mut reread).unwrap();
        assert_eq!(reread.field_value("description"), "Push to prod\nsafely");
        assert_eq!(reread.field_value("acceptanceCriteria"), "Green & deployed");
    }

    #[test]
    fn test_unhydrated_items_keep_values_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let master = temp_dir.path().join("project.xml");
        let mut model = scenario_model();
        let g1 = model.find_by_item_id("g1").unwrap();
        {
            let goal = model.item_mut(g1).unwrap();
            goal.set_field_value("description", "Because").unwrap();
            goal.mark_hydrated();
        }
        let saver = Saver::new("1.0.0");
        saver.save(&model, &master).unwrap();

        // A fresh skeleton has no field values in memory.
        let skeleton = Loader::default().load_skeleton_file(&master, false).unwrap();
        saver.save(&skeleton, &master).unwrap();

        let mut reread = item("goal", "Ship it", "g1");
        Loader::default().hydrate_fields(Some(&master), &mut reread).unwrap();
        assert_eq!(reread.field_value("description"), "Because");
    }

    #[test]
    fn test_corrupt_detail_file_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let master = temp_dir.path().join("project.xml");
        let saver = Saver::new("1.0.0");
        saver.save(&scenario_model(), &master).unwrap();

        let detail = temp_dir.path().join("goal/g1.xml");
        let corrupt = "<goal id=\"g1\"><name>Ship it</name><description>R&D notes</description></goal>";
        fs::write(&detail, corrupt).unwrap();

        let mut skeleton = Loader::default().load_skeleton_file(&master, false).unwrap();
        let g1 = skeleton.find_by_item_id("g1").unwrap();
        let err = Loader::default()
            .hydrate_fields(Some(&master), skeleton.item_mut(g1).unwrap())
            .unwrap_err();
        assert!(matches!(err, ModestError::Parse { .. }));

        let err = saver.save(&skeleton, &master).unwrap_err();
        assert!(matches!(err, ModestError::Parse { .. }));
        assert_eq!(fs::read_to_string(&detail).unwrap(), corrupt);
    }

    #[test]
    fn test_in_memory_edit_wins_over_disk() {
        let temp_dir = TempDir::new().unwrap();
        let master = temp_dir.path().join("project.xml");
        let saver = Saver::new("1.0.0");
        let mut model = scenario_model();
        let g1 = model.find_by_item_id("g1").unwrap();
        model.item_mut(g1).unwrap().set_field_value("description", "old").unwrap();
        saver.save(&model, &master).unwrap();

        let mut skeleton = Loader::default().load_skeleton_file(&master, false).unwrap();
        let g1 = skeleton.find_by_item_id("g1").unwrap();
        skeleton.item_mut(g1).unwrap().set_field_value("description", "new").unwrap();
        saver.save(&skeleton, &master).unwrap();

        let mut reread = item("goal", "Ship it", "g1");
        Loader::default().hydrate_fields(Some(&master), &mut reread).unwrap();
        assert_eq!(reread.field_value("description"), "new");
    }

    #[test]
    fn test_orphans_listed_and_kept_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let master = temp_dir.path().join("project.xml");
        let saver = Saver::new("1.0.0");
        let mut model = scenario_model();
        saver.save(&model, &master).unwrap();

        let g1 = model.find_by_item_id("g1").unwrap();
        model.remove(g1).unwrap();
        fs::write(temp_dir.path().join("goal/notes.txt"), "keep").unwrap();
        let report = saver.save(&model, &master).unwrap();
        assert!(report.orphans_removed.is_empty());

        let orphans = saver.orphaned_detail_files(&model, &master).unwrap();
        assert_eq!(
            orphans,
            vec![
                temp_dir.path().join("funcRequirement/f1.xml"),
                temp_dir.path().join("goal/g1.xml"),
            ]
        );
        assert!(temp_dir.path().join("goal/g1.xml").exists());
    }

    #[test]
    fn test_prune_orphans() {
        let temp_dir = TempDir::new().unwrap();
        let master = temp_dir.path().join("project.xml");
        let mut model = scenario_model();
        Saver::new("1.0.0").save(&model, &master).unwrap();

        let s1 = model.find_by_item_id("s1").unwrap();
        model.remove(s1).unwrap();
        let report = Saver::new("1.0.0")
            .with_prune_orphans(true)
            .save(&model, &master)
            .unwrap();
        assert_eq!(report.orphans_removed, vec![temp_dir.path().join("section/s1.xml")]);
        assert!(!temp_dir.path().join("section/s1.xml").exists());
        assert!(temp_dir.path().join("goal/g1.xml").exists());
    }

    #[test]
    fn test_unwritable_location_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let master = blocker.join("project.xml");

        let err = Saver::new("1.0.0").save(&scenario_model(), &master).unwrap_err();
        match err {
            ModestError::Io { operation, path, .. } => {
                assert_eq!(operation, IoOperation::CreateDir);
                assert_eq!(path, blocker.join("root"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!master.exists());
    }

    #[test]
    fn test_master_write_failure_keeps_detail_files() {
        let temp_dir = TempDir::new().unwrap();
        let master = temp_dir.path().join("project.xml");
        fs::create_dir(&master).unwrap();

        let err = Saver::new("1.0.0").save(&scenario_model(), &master).unwrap_err();
        match err {
            ModestError::Io { operation, path, .. } => {
                assert_eq!(operation, IoOperation::Write);
                assert_eq!(path, master);
            }
            other => panic!("unexpected error: {other}"),
        }
        for rel in ["root/r1.xml", "goal/g1.xml", "funcRequirement/f1.xml", "section/s1.xml"] {
            assert!(temp_dir.path().join(rel).is_file(), "{rel} missing");
        }
    }
}
