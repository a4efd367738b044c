//! Reads master documents into skeleton trees and hydrates item fields
//! from detail files.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{IoOperation, ModestError, Result};
use crate::models::Item;
use crate::paths::item_detail_path;
use crate::registry::ItemRegistry;
use crate::tree::{NodeId, TreeModel};
use crate::xml::{self, Element};

pub struct Loader {
    registry: ItemRegistry,
}

impl Loader {
    pub fn new(registry: ItemRegistry) -> Self {
        Self { registry }
    }

    /// Loads the skeleton of the master document at `path`
    pub fn load_skeleton_file(&self, path: &Path, reset_ids: bool) -> Result<TreeModel> {
        let document =
            fs::read_to_string(path).map_err(|e| ModestError::io(IoOperation::Read, path, e))?;
        self.load_skeleton(&document, &path.display().to_string(), reset_ids)
    }

    /// Loads a skeleton from raw document bytes, e.g. a bundled template
    pub fn load_skeleton_bytes(
        &self,
        bytes: &[u8],
        source_name: &str,
        reset_ids: bool,
    ) -> Result<TreeModel> {
        let document =
            std::str::from_utf8(bytes).map_err(|e| ModestError::parse(source_name, e))?;
        self.load_skeleton(document, source_name, reset_ids)
    }

    /// Builds a tree of identity-only items from a master document
    ///
    /// Only direct children whose tag is a creatable item type become tree
    /// nodes; anything else is foreign content and is skipped. With
    /// `reset_ids` every item receives a fresh id, so a template can be
    /// instantiated any number of times without id collisions.
    pub fn load_skeleton(
        &self,
        document: &str,
        source_name: &str,
        reset_ids: bool,
    ) -> Result<TreeModel> {
        let document = document.trim_start_matches('\u{feff}');
        let root_el = xml::parse(document, source_name)?;
        let position = format!("/{}", root_el.tag);

        if !self.registry.resolve(&root_el.tag)?.is_root() {
            return Err(malformed(
                &root_el,
                &position,
                "a project document must start with <root>",
            ));
        }

        let mut seen = HashSet::new();
        let root_item = self.item_from_element(&root_el, &position, reset_ids, &mut seen)?;
        let mut model = TreeModel::new(root_item);
        let root = model.root();
        self.collect_children(&mut model, root, &root_el, &position, reset_ids, &mut seen)?;

        log::info!(
            "Loaded {} items from {}{}",
            model.len(),
            source_name,
            if reset_ids { " with fresh ids" } else { "" }
        );
        Ok(model)
    }

    fn collect_children(
        &self,
        model: &mut TreeModel,
        node: NodeId,
        element: &Element,
        position: &str,
        reset_ids: bool,
        seen: &mut HashSet<String>,
    ) -> Result<()> {
        let mut tag_counts: Vec<(&str, usize)> = Vec::new();

        for child_el in element.elements() {
            let nth = match tag_counts.iter_mut().find(|(tag, _)| *tag == child_el.tag) {
                Some((_, count)) => {
                    *count += 1;
                    *count
                }
                None => {
                    tag_counts.push((child_el.tag.as_str(), 1));
                    1
                }
            };

            if self.registry.creatable(&child_el.tag).is_none() {
                if child_el.tag != "name" {
                    log::debug!("Skipping foreign element <{}> under {}", child_el.tag, position);
                }
                continue;
            }

            let child_position = format!("{}/{}[{}]", position, child_el.tag, nth);
            let item = self.item_from_element(child_el, &child_position, reset_ids, seen)?;
            let child = model.append(node, item)?;
            self.collect_children(model, child, child_el, &child_position, reset_ids, seen)?;
        }
        Ok(())
    }

    fn item_from_element(
        &self,
        element: &Element,
        position: &str,
        reset_ids: bool,
        seen: &mut HashSet<String>,
    ) -> Result<Item> {
        let id = element
            .attribute("id")
            .ok_or_else(|| malformed(element, position, "missing id attribute"))?;
        if !is_valid_id(id) {
            return Err(malformed(
                element,
                position,
                &format!("id '{id}' cannot be used as a file name"),
            ));
        }
        let name = element
            .child("name")
            .ok_or_else(|| malformed(element, position, "missing <name> element"))?
            .text()
            .unwrap_or_default();

        let mut item = self.registry.create(&name, &element.tag, Some(id))?;
        if reset_ids {
            item.reset_id();
        }
        if !seen.insert(item.id().to_string()) {
            log::warn!("Duplicate item id '{}' at {}", item.id(), position);
        }
        Ok(item)
    }

    /// Populates `item`'s fields from its detail file
    ///
    /// Does nothing while the project has no path. Fields without a
    /// matching element, or whose element has no text, stay unset.
    pub fn hydrate_fields(&self, master_path: Option<&Path>, item: &mut Item) -> Result<()> {
        let Some(master_path) = master_path else {
            return Ok(());
        };

        let detail_path = item_detail_path(master_path, item);
        for (key, value) in self.read_field_values(&detail_path, item)? {
            item.set_field_value(key, value)?;
        }
        item.mark_hydrated();
        Ok(())
    }

    /// Field values present in a detail file, in schema order
    pub(crate) fn read_field_values(
        &self,
        detail_path: &Path,
        item: &Item,
    ) -> Result<Vec<(&'static str, String)>> {
        let document = fs::read_to_string(detail_path)
            .map_err(|e| ModestError::io(IoOperation::Read, detail_path, e))?;
        let doc = xml::parse(&document, &detail_path.display().to_string())?;
        log::debug!("Read detail file {}", detail_path.display());

        if doc.tag != item.item_type().tag() || doc.attribute("id") != Some(item.id()) {
            log::warn!(
                "Detail file {} describes <{} id={:?}>, expected <{} id=\"{}\">",
                detail_path.display(),
                doc.tag,
                doc.attribute("id"),
                item.item_type(),
                item.id()
            );
        }

        Ok(item
            .field_schema()
            .iter()
            .filter_map(|field| {
                doc.find_descendant(field.key)
                    .and_then(Element::text)
                    .map(|value| (field.key, value))
            })
            .collect())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(ItemRegistry::new())
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
}

fn malformed(element: &Element, position: &str, reason: &str) -> ModestError {
    ModestError::MalformedItem {
        tag: element.tag.clone(),
        position: position.to_string(),
        reason: reason.to_string(),
    }
}
