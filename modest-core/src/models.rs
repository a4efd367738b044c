use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::error::{ModestError, Result};

/// How a detail field is edited and displayed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    SingleLine,
    MultiLine,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::SingleLine => write!(f, "single-line"),
            FieldKind::MultiLine => write!(f, "multi-line"),
        }
    }
}

/// One entry of an item type's ordered field schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Element name used in detail files
    pub key: &'static str,
    pub kind: FieldKind,
}

const ROOT_FIELDS: &[FieldSpec] = &[FieldSpec {
    key: "version",
    kind: FieldKind::SingleLine,
}];

const DESCRIPTION_FIELDS: &[FieldSpec] = &[FieldSpec {
    key: "description",
    kind: FieldKind::MultiLine,
}];

const FUNC_REQUIREMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "description",
        kind: FieldKind::MultiLine,
    },
    FieldSpec {
        key: "acceptanceCriteria",
        kind: FieldKind::MultiLine,
    },
];

/// The closed set of item variants a project tree can hold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ItemType {
    #[serde(rename = "root")]
    Root,
    #[serde(rename = "goal")]
    Goal,
    #[serde(rename = "section")]
    Section,
    #[serde(rename = "funcRequirement")]
    FuncRequirement,
    #[serde(rename = "nonFuncRequirement")]
    NonFuncRequirement,
}

impl ItemType {
    /// Every variant, root first
    pub const ALL: [ItemType; 5] = [
        ItemType::Root,
        ItemType::Goal,
        ItemType::Section,
        ItemType::FuncRequirement,
        ItemType::NonFuncRequirement,
    ];

    /// XML element name and type-bucket directory name
    pub fn tag(&self) -> &'static str {
        match self {
            ItemType::Root => "root",
            ItemType::Goal => "goal",
            ItemType::Section => "section",
            ItemType::FuncRequirement => "funcRequirement",
            ItemType::NonFuncRequirement => "nonFuncRequirement",
        }
    }

    /// Variant for an element tag, root included
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// Whether this is the structural root type
    pub fn is_root(&self) -> bool {
        matches!(self, ItemType::Root)
    }

    /// Ordered detail fields for this variant
    pub fn field_schema(&self) -> &'static [FieldSpec] {
        match self {
            ItemType::Root => ROOT_FIELDS,
            ItemType::Goal | ItemType::Section | ItemType::NonFuncRequirement => {
                DESCRIPTION_FIELDS
            }
            ItemType::FuncRequirement => FUNC_REQUIREMENT_FIELDS,
        }
    }

    /// Name given to freshly added items of this type
    pub fn default_name(&self) -> &'static str {
        match self {
            ItemType::Root => "New project",
            ItemType::Goal => "New goal",
            ItemType::Section => "New section",
            ItemType::FuncRequirement => "New functional requirement",
            ItemType::NonFuncRequirement => "New non-functional requirement",
        }
    }

    /// Get display label for menus
    pub fn label(&self) -> &'static str {
        match self {
            ItemType::Root => "Project",
            ItemType::Goal => "Goal",
            ItemType::Section => "Section",
            ItemType::FuncRequirement => "Functional requirement",
            ItemType::NonFuncRequirement => "Non-functional requirement",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A typed entry of the project tree
///
/// Identity (`id`, `name`, type) lives in the master document; field
/// values live in the item's detail file and are only present after
/// hydration or in-memory edits.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Item {
    id: String,
    #[serde(rename = "type")]
    item_type: ItemType,
    pub name: String,
    #[serde(rename = "fields")]
    field_values: HashMap<String, String>,
    #[serde(skip)]
    hydrated: bool,
}

impl Item {
    pub(crate) fn new(item_type: ItemType, name: String, id: String) -> Self {
        Self {
            id,
            item_type,
            name,
            field_values: HashMap::new(),
            hydrated: false,
        }
    }

    /// Unique id, also the detail file's stem
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Variant of the item
    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    /// Whether this is the project root
    pub fn is_root(&self) -> bool {
        self.item_type.is_root()
    }

    /// Ordered detail fields of the item's type
    pub fn field_schema(&self) -> &'static [FieldSpec] {
        self.item_type.field_schema()
    }

    /// Whether `key` is part of the item's schema
    pub fn has_field(&self, key: &str) -> bool {
        self.field_schema().iter().any(|f| f.key == key)
    }

    /// Value of a field; unset fields read as an empty string
    pub fn field_value(&self, key: &str) -> &str {
        self.field_values.get(key).map(String::as_str).unwrap_or("")
    }

    /// Value held in memory, distinguishing unset from empty
    pub(crate) fn stored_field_value(&self, key: &str) -> Option<&str> {
        self.field_values.get(key).map(String::as_str)
    }

    /// Sets a field value, rejecting keys outside the item's schema
    pub fn set_field_value(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        if !self.has_field(key) {
            return Err(ModestError::UnknownField {
                item_type: self.item_type.tag().to_string(),
                field: key.to_string(),
            });
        }
        self.field_values.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Whether field values reflect the detail file or in-memory edits
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub(crate) fn mark_hydrated(&mut self) {
        self.hydrated = true;
    }

    /// Replaces the id with a freshly generated one
    pub fn reset_id(&mut self) {
        self.id = generate_id();
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
