//! Error type shared by every persistence operation

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// File system operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    Read,
    Write,
    CreateDir,
    Remove,
    ListDir,
}

impl fmt::Display for IoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoOperation::Read => write!(f, "read"),
            IoOperation::Write => write!(f, "write"),
            IoOperation::CreateDir => write!(f, "create directory"),
            IoOperation::Remove => write!(f, "remove"),
            IoOperation::ListDir => write!(f, "list directory"),
        }
    }
}

/// Errors raised while loading, hydrating or saving a project
#[derive(Debug, Error)]
pub enum ModestError {
    /// The input is not well-formed XML
    #[error("XML parse error in {source_name}: {message}")]
    Parse {
        /// File path or other label for the document being parsed
        source_name: String,
        message: String,
    },

    /// Well-formed XML that lacks required identity data
    #[error("malformed <{tag}> item at {position}: {reason}")]
    MalformedItem {
        tag: String,
        /// Element path within the document, e.g. `/root/goal[2]`
        position: String,
        reason: String,
    },

    /// Type tag not present in the item registry
    #[error("unknown item type '{0}'")]
    UnknownItemType(String),

    /// Field key that the item's schema does not define
    #[error("item type '{item_type}' has no field '{field}'")]
    UnknownField { item_type: String, field: String },

    /// Tree handle that does not refer to a live node
    #[error("tree node {0} does not exist")]
    UnknownNode(usize),

    /// Moving a node under itself, one of its descendants, or moving the root
    #[error("cannot move tree node {node} under node {target}")]
    InvalidMove { node: usize, target: usize },

    /// Saving without a master path
    #[error("project has no file path yet")]
    NoProjectPath,

    #[error("failed to {operation} {}: {source}", path.display())]
    Io {
        operation: IoOperation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl ModestError {
    pub(crate) fn io(operation: IoOperation, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModestError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(source_name: impl Into<String>, message: impl ToString) -> Self {
        ModestError::Parse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModestError>;
