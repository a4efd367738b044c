use anyhow::Result;
use inquire::{Confirm, Editor, Select, Text};
use std::fmt;

use modest_core::{FieldKind, FieldSpec, Item, ItemType};

struct TypeChoice(ItemType);

impl fmt::Display for TypeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0.label(), self.0.tag())
    }
}

/// Prompts for the type of a new item
pub fn prompt_item_type(types: &[ItemType]) -> Result<ItemType> {
    let options = types.iter().copied().map(TypeChoice).collect();
    let choice = Select::new("Item type:", options).prompt()?;
    Ok(choice.0)
}

/// Prompts for a field value, starting from the current one
pub fn prompt_field_value(item: &Item, field: &FieldSpec) -> Result<String> {
    let label = format!("{}:", field.key);
    let current = item.field_value(field.key);

    let value = match field.kind {
        // Use the Editor type for multiline input
        FieldKind::MultiLine => Editor::new(&label)
            .with_predefined_text(current)
            .prompt()?,
        FieldKind::SingleLine => Text::new(&label).with_initial_value(current).prompt()?,
    };
    Ok(value)
}

/// Asks before dropping a subtree
pub fn confirm_remove(item: &Item, subtree_size: usize) -> Result<bool> {
    let message = if subtree_size > 1 {
        format!(
            "Remove '{}' and {} items below it?",
            item.name,
            subtree_size - 1
        )
    } else {
        format!("Remove '{}'?", item.name)
    };
    Ok(Confirm::new(&message).with_default(false).prompt()?)
}
