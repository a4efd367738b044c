mod cli;
mod prompts;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs;
use std::path::Path;

use modest_core::{
    get_config_path, item_detail_path, Config, Item, ItemType, NodeId, Project, TreeModel,
};

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = get_config_path()?;
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    let project_path = cli
        .file
        .clone()
        .unwrap_or_else(|| config.default_project_path());
    log::debug!("Using project file {:?}", project_path);

    match &cli.command {
        Command::New { force } => new_project(&config, &project_path, *force)?,
        Command::Tree { json, fields } => {
            let mut project = open_project(&config, &project_path)?;
            if *json {
                print_tree_json(&mut project, *fields)?;
            } else {
                print_tree(project.model());
            }
        }
        Command::Types => {
            for item_type in creatable_types() {
                println!("{:<20} {}", item_type.tag().green(), item_type.label());
            }
        }
        Command::Add {
            r#type,
            parent,
            name,
        } => {
            let mut project = open_project(&config, &project_path)?;
            let type_tag = match r#type {
                Some(tag) => tag.clone(),
                None => prompts::prompt_item_type(project.list_creatable_types())?
                    .tag()
                    .to_string(),
            };
            let parent = parent
                .as_deref()
                .map(|id| find_node(&project, id))
                .transpose()?;

            let node = project.add_item(&type_tag, parent)?;
            if let Some(name) = name {
                project.rename_item(node, name)?;
            }
            project.save()?;

            let item = project.item(node).context("New item vanished")?;
            println!("{} {} {}", "Added".green(), item.item_type(), item.id());
        }
        Command::Remove { id, yes } => {
            let mut project = open_project(&config, &project_path)?;
            let node = find_node(&project, id)?;
            if node == project.root() {
                bail!("The project root cannot be removed");
            }
            let item = project.item(node).context("Item not found")?;
            let size = project.model().subtree_size(node);
            if !*yes && !prompts::confirm_remove(item, size)? {
                println!("Cancelled");
                return Ok(());
            }

            let removed = project.remove_item(node)?;
            let report = project.save()?;
            println!("{} {} item(s)", "Removed".red(), removed);
            if report.orphans_removed.is_empty() && !config.prune_orphans {
                println!(
                    "Detail files were kept; run `modest orphans --prune` to delete them"
                );
            }
        }
        Command::Rename { id, name } => {
            let mut project = open_project(&config, &project_path)?;
            let node = find_node(&project, id)?;
            project.rename_item(node, name)?;
            project.save()?;
            println!("{} {}", "Renamed".green(), name);
        }
        Command::Move { id, parent, index } => {
            let mut project = open_project(&config, &project_path)?;
            let node = find_node(&project, id)?;
            let new_parent = find_node(&project, parent)?;
            let index = index.unwrap_or(usize::MAX);
            project.model_mut().move_node(node, new_parent, index)?;
            project.save()?;
            println!("{} {}", "Moved".green(), id);
        }
        Command::Show { id } => {
            let mut project = open_project(&config, &project_path)?;
            let node = find_node(&project, id)?;
            show_item(&mut project, node)?;
        }
        Command::Set { id, field, value } => {
            let mut project = open_project(&config, &project_path)?;
            let node = find_node(&project, id)?;
            let item = project.hydrate_fields(node)?;
            let spec = *item
                .field_schema()
                .iter()
                .find(|f| f.key == field.as_str())
                .with_context(|| {
                    format!(
                        "'{}' items have no field '{}' (fields: {})",
                        item.item_type(),
                        field,
                        field_names(item)
                    )
                })?;

            let value = match value {
                Some(v) => v.clone(),
                None => prompts::prompt_field_value(item, &spec)?,
            };
            project.set_field_value(node, spec.key, &value)?;
            project.save()?;
            println!("{} {}", "Updated".green(), spec.key);
        }
        Command::Orphans { prune } => {
            let project = open_project(&config, &project_path)?;
            let saver = config.saver();
            let orphans = saver.orphaned_detail_files(project.model(), &project_path)?;
            if orphans.is_empty() {
                println!("No orphaned detail files");
            }
            for orphan in &orphans {
                if *prune {
                    fs::remove_file(orphan)
                        .with_context(|| format!("Failed to remove {:?}", orphan))?;
                    println!("{} {}", "Deleted".red(), orphan.display());
                } else {
                    println!("{}", orphan.display());
                }
            }
        }
        Command::Config { init } => {
            if *init {
                config.save(&config_path)?;
                println!("{} {}", "Wrote".green(), config_path.display());
            }
            println!("{}: {}", "Config file".blue(), config_path.display());
            println!("{}: {} {}", "Application".blue(), config.app_name, config.app_version);
            println!(
                "{}: {}",
                "Default project".blue(),
                config.default_project_path().display()
            );
            match &config.template_path {
                Some(path) => println!("{}: {}", "Template".blue(), path.display()),
                None => println!("{}: bundled", "Template".blue()),
            }
            println!("{}: {}", "Prune orphans".blue(), config.prune_orphans);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "modest_core=debug,modest_cli=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn creatable_types() -> &'static [ItemType] {
    modest_core::ItemRegistry::new().list_types()
}

fn open_project(config: &Config, path: &Path) -> Result<Project> {
    if !path.exists() {
        bail!(
            "No project at {:?}; create one with `modest new` or pass --file",
            path
        );
    }
    Project::open(path, config.saver()).with_context(|| format!("Failed to open {:?}", path))
}

fn new_project(config: &Config, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{:?} already exists (use --force to overwrite)", path);
    }
    let template = config.template_bytes()?;
    let mut project = Project::from_template(&template, config.saver())?;
    let report = project
        .save_as(path)
        .with_context(|| format!("Failed to save new project to {:?}", path))?;
    println!(
        "{} {} ({} items)",
        "Created".green(),
        path.display(),
        report.items_written
    );
    Ok(())
}

/// Resolves a full item id or a unique prefix of one
fn find_node(project: &Project, id: &str) -> Result<NodeId> {
    if let Some(node) = project.find_by_item_id(id) {
        return Ok(node);
    }

    let model = project.model();
    let matches: Vec<NodeId> = model
        .iter()
        .filter(|n| model.item(*n).is_some_and(|item| item.id().starts_with(id)))
        .collect();
    match matches.as_slice() {
        [node] => Ok(*node),
        [] => bail!("No item with id '{}'", id),
        _ => bail!("Id prefix '{}' matches {} items", id, matches.len()),
    }
}

/// Prints the tree as an outline:
///
/// ```text
/// Payments [root] 3f2a...
/// ├── Accept cards [goal] 91c0...
/// │   └── Card form [funcRequirement] 5d17...
/// └── Latency [nonFuncRequirement] a4e8...
/// ```
fn print_tree(model: &TreeModel) {
    let root = model.root();
    if let Some(item) = model.item(root) {
        println!(
            "{} {} {}",
            item.name.bold(),
            format!("[{}]", item.item_type()).cyan(),
            item.id().dimmed()
        );
    }
    let children = model.children(root);
    for (i, child) in children.iter().enumerate() {
        print_node(model, *child, "", i == children.len() - 1);
    }
}

fn print_node(model: &TreeModel, node: NodeId, prefix: &str, is_last: bool) {
    let Some(item) = model.item(node) else {
        return;
    };
    let connector = if is_last { "└── " } else { "├── " };
    println!(
        "{}{}{} {} {}",
        prefix,
        connector,
        item.name,
        format!("[{}]", item.item_type()).cyan(),
        item.id().dimmed()
    );

    let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
    let children = model.children(node);
    for (i, child) in children.iter().enumerate() {
        print_node(model, *child, &child_prefix, i == children.len() - 1);
    }
}

fn print_tree_json(project: &mut Project, with_fields: bool) -> Result<()> {
    if with_fields {
        project.hydrate_all()?;
    }
    let value = node_json(project.model(), project.root())?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn node_json(model: &TreeModel, node: NodeId) -> Result<serde_json::Value> {
    let item = model.item(node).context("Item not found")?;
    let mut value = serde_json::to_value(item)?;
    let children = model
        .children(node)
        .iter()
        .map(|child| node_json(model, *child))
        .collect::<Result<Vec<_>>>()?;
    value["children"] = serde_json::Value::Array(children);
    Ok(value)
}

fn show_item(project: &mut Project, node: NodeId) -> Result<()> {
    let path: Vec<String> = project
        .model()
        .path_to(node)
        .iter()
        .filter_map(|n| project.item(*n).map(|item| item.name.clone()))
        .collect();
    let detail_path = project
        .path()
        .and_then(|master| project.item(node).map(|item| item_detail_path(master, item)));

    let item = project.hydrate_fields(node)?;
    println!("{}: {}", "ID".blue(), item.id());
    println!("{}: {}", "Type".blue(), item.item_type().label());
    println!("{}: {}", "Name".blue(), item.name);
    println!("{}: {}", "Path".blue(), path.join(" / "));
    if let Some(detail_path) = detail_path {
        println!("{}: {}", "Detail file".blue(), detail_path.display());
    }
    for field in item.field_schema() {
        let value = item.field_value(field.key);
        let shown = if value.is_empty() {
            "(empty)".dimmed().to_string()
        } else {
            value.to_string()
        };
        println!("{} ({}):\n{}", field.key.blue(), field.kind, shown);
    }
    Ok(())
}

fn field_names(item: &Item) -> String {
    item.field_schema()
        .iter()
        .map(|f| f.key)
        .collect::<Vec<_>>()
        .join(", ")
}
