//! Item type registry
//!
//! Maps type tags to item constructors. Adding a variant means extending
//! [`ItemType`] and the order below, nothing else.

use crate::error::{ModestError, Result};
use crate::models::{generate_id, Item, ItemType};

/// User-creatable types, in the order they are offered
const CREATABLE_TYPES: [ItemType; 4] = [
    ItemType::Goal,
    ItemType::Section,
    ItemType::FuncRequirement,
    ItemType::NonFuncRequirement,
];

/// Constructs items from type tags
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemRegistry;

impl ItemRegistry {
    /// Creates a registry over the built-in item types
    pub fn new() -> Self {
        Self
    }

    /// Constructs an item of the given type tag
    ///
    /// A fresh UUID is generated when `id` is `None`. Unknown tags fail
    /// with [`ModestError::UnknownItemType`].
    pub fn create(&self, name: &str, type_tag: &str, id: Option<&str>) -> Result<Item> {
        let item_type = self.resolve(type_tag)?;
        let id = id.map(str::to_string).unwrap_or_else(generate_id);
        Ok(Item::new(item_type, name.to_string(), id))
    }

    /// Looks up a type tag, root included
    pub fn resolve(&self, type_tag: &str) -> Result<ItemType> {
        ItemType::from_tag(type_tag).ok_or_else(|| ModestError::UnknownItemType(type_tag.to_string()))
    }

    /// Types a user may add to a tree; never includes the root type
    pub fn list_types(&self) -> &'static [ItemType] {
        &CREATABLE_TYPES
    }

    /// Creatable type for a tag; `None` for the root tag and foreign tags
    pub fn creatable(&self, type_tag: &str) -> Option<ItemType> {
        self.list_types().iter().copied().find(|t| t.tag() == type_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_with_id() {
        let item = ItemRegistry::new().create("Ship it", "goal", Some("g1")).unwrap();
        assert_eq!(item.id(), "g1");
        assert_eq!(item.name, "Ship it");
        assert_eq!(item.item_type(), ItemType::Goal);
        assert!(!item.is_root());
        assert!(!item.is_hydrated());
    }

    #[test]
    fn test_create_generates_unique_ids() {
        let registry = ItemRegistry::new();
        let a = registry.create("a", "section", None).unwrap();
        let b = registry.create("b", "section", None).unwrap();
        assert!(!a.id().is_empty());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_create_root() {
        let item = ItemRegistry::new().create("Proj", "root", Some("r1")).unwrap();
        assert!(item.is_root());
    }

    #[test]
    fn test_unknown_type_fails() {
        let err = ItemRegistry::new().create("x", "chapter", None).unwrap_err();
        match err {
            ModestError::UnknownItemType(tag) => assert_eq!(tag, "chapter"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(ItemRegistry::new().create("x", "", None).is_err());
    }

    #[test]
    fn test_list_types_is_stable_and_excludes_root() {
        let registry = ItemRegistry::new();
        let tags: Vec<_> = registry.list_types().iter().map(|t| t.tag()).collect();
        assert_eq!(tags, vec!["goal", "section", "funcRequirement", "nonFuncRequirement"]);
        assert_eq!(registry.list_types(), registry.list_types());
        assert!(!registry.list_types().contains(&ItemType::Root));
        assert_eq!(registry.creatable("goal"), Some(ItemType::Goal));
        assert_eq!(registry.creatable("root"), None);
    }
}
