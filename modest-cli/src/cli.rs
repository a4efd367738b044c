use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Edit Modest requirement projects")]
pub struct Cli {
    /// Path to the project master file (defaults to the configured project path)
    #[clap(long, short = 'f', global = true)]
    pub file: Option<PathBuf>,

    /// Log debug output to stderr
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new project from the template
    New {
        /// Overwrite an existing master file
        #[clap(long)]
        force: bool,
    },

    /// Print the project tree
    Tree {
        /// Print JSON instead of an outline
        #[clap(long)]
        json: bool,

        /// Load every item's fields (JSON output only)
        #[clap(long, requires = "json")]
        fields: bool,
    },

    /// List the item types that can be added
    Types,

    /// Add an item
    Add {
        /// Item type; prompts when omitted
        r#type: Option<String>,

        /// Id (or unique id prefix) of the parent item; the root when omitted
        #[clap(long)]
        parent: Option<String>,

        /// Name for the new item instead of the type's default
        #[clap(long)]
        name: Option<String>,
    },

    /// Remove an item and everything below it
    Remove {
        /// Id or unique id prefix
        id: String,

        /// Skip the confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Rename an item
    Rename {
        /// Id or unique id prefix
        id: String,

        /// New name
        name: String,
    },

    /// Move an item under a new parent
    Move {
        /// Id or unique id prefix
        id: String,

        /// Id (or unique id prefix) of the new parent
        #[clap(long)]
        parent: String,

        /// Position among the new siblings; last when omitted
        #[clap(long)]
        index: Option<usize>,
    },

    /// Show an item with its fields
    Show {
        /// Id or unique id prefix
        id: String,
    },

    /// Set a field of an item
    Set {
        /// Id or unique id prefix
        id: String,

        /// Field name, e.g. description
        field: String,

        /// New value; opens an editor when omitted
        #[clap(long)]
        value: Option<String>,
    },

    /// List detail files whose items are no longer in the project
    Orphans {
        /// Delete them
        #[clap(long)]
        prune: bool,
    },

    /// Show configuration
    Config {
        /// Write the current configuration to the config file
        #[clap(long)]
        init: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::parse_from([
            "modest", "add", "goal", "--parent", "abc", "--file", "p/project.xml",
        ]);
        assert_eq!(cli.file, Some(PathBuf::from("p/project.xml")));
        match cli.command {
            Command::Add { r#type, parent, name } => {
                assert_eq!(r#type.as_deref(), Some("goal"));
                assert_eq!(parent.as_deref(), Some("abc"));
                assert!(name.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_fields_requires_json() {
        assert!(Cli::try_parse_from(["modest", "tree", "--fields"]).is_err());
        assert!(Cli::try_parse_from(["modest", "tree", "--json", "--fields"]).is_ok());
    }
}
