//! Detail file locations
//!
//! A detail file's location depends only on the project location, the
//! item's type and its id, never on where the item sits in the tree.

use std::path::{Path, PathBuf};

use crate::models::Item;

pub const DETAIL_EXTENSION: &str = "xml";

/// Directory holding all detail files of the item's type
pub fn item_type_dir(master_path: &Path, item: &Item) -> PathBuf {
    project_dir(master_path).join(item.item_type().tag())
}

/// `<project-dir>/<type>/<id>.xml`
pub fn item_detail_path(master_path: &Path, item: &Item) -> PathBuf {
    item_type_dir(master_path, item).join(format!("{}.{}", item.id(), DETAIL_EXTENSION))
}

/// Directory containing the master document
pub fn project_dir(master_path: &Path) -> &Path {
    master_path.parent().unwrap_or_else(|| Path::new(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ItemRegistry;

    #[test]
    fn test_detail_path_layout() {
        let item = ItemRegistry::new().create("Ship it", "goal", Some("g1")).unwrap();
        let master = Path::new("/work/proj/project.xml");
        assert_eq!(item_type_dir(master, &item), PathBuf::from("/work/proj/goal"));
        assert_eq!(item_detail_path(master, &item), PathBuf::from("/work/proj/goal/g1.xml"));
    }

    #[test]
    fn test_same_type_shares_bucket() {
        let registry = ItemRegistry::new();
        let a = registry.create("a", "funcRequirement", Some("a")).unwrap();
        let b = registry.create("b", "funcRequirement", Some("b")).unwrap();
        let master = Path::new("p/project.xml");
        assert_eq!(item_type_dir(master, &a), item_type_dir(master, &b));
        assert_ne!(item_detail_path(master, &a), item_detail_path(master, &b));
    }

    #[test]
    fn test_path_ignores_name() {
        let registry = ItemRegistry::new();
        let mut item = registry.create("old", "section", Some("s1")).unwrap();
        let master = Path::new("p/project.xml");
        let before = item_detail_path(master, &item);
        item.name = "new".to_string();
        assert_eq!(item_detail_path(master, &item), before);
    }

    #[test]
    fn test_bare_file_name() {
        let item = ItemRegistry::new().create("r", "root", Some("r1")).unwrap();
        assert_eq!(
            item_detail_path(Path::new("project.xml"), &item),
            PathBuf::from("root/r1.xml")
        );
    }
}
