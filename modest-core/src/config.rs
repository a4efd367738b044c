use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IoOperation, ModestError, Result};
use crate::project::DEFAULT_TEMPLATE;
use crate::saver::Saver;

/// Application settings supplied to the editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app_name: String,
    /// Written as `appVersion` on saved master documents; always the
    /// running build's version
    #[serde(skip, default = "default_app_version")]
    pub app_version: String,
    /// File name used for new projects
    pub default_filename: String,
    /// Directory for new projects; the working directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_dir: Option<PathBuf>,
    /// Master document used by "new project" instead of the bundled one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,
    /// Delete detail files of removed items on save
    pub prune_orphans: bool,
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Modest".to_string(),
            app_version: default_app_version(),
            default_filename: "project.xml".to_string(),
            default_dir: None,
            template_path: None,
            prune_orphans: false,
        }
    }
}

impl Config {
    /// Loads the configuration from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| ModestError::io(IoOperation::Read, path, e))?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ModestError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if sets_app_version(&content) {
            log::warn!(
                "Ignoring app_version in {:?}; saved projects use {}",
                path,
                config.app_version
            );
        }
        Ok(config)
    }

    /// Loads the configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            log::debug!("No config at {:?}, using defaults", path.as_ref());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save the configuration to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).map_err(|e| ModestError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        // Ensure parent directories exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ModestError::io(IoOperation::CreateDir, parent, e))?;
        }

        fs::write(path, content).map_err(|e| ModestError::io(IoOperation::Write, path, e))
    }

    /// Where a new project is saved when no path is given
    pub fn default_project_path(&self) -> PathBuf {
        self.default_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(&self.default_filename)
    }

    /// Master document used to start new projects
    pub fn template_bytes(&self) -> Result<Cow<'static, [u8]>> {
        match &self.template_path {
            Some(path) => fs::read(path)
                .map(Cow::Owned)
                .map_err(|e| ModestError::io(IoOperation::Read, path, e)),
            None => Ok(Cow::Borrowed(DEFAULT_TEMPLATE)),
        }
    }

    /// Saver stamped with this build's version
    pub fn saver(&self) -> Saver {
        Saver::new(self.app_version.clone()).with_prune_orphans(self.prune_orphans)
    }
}

/// Whether a config document tries to set the build version
fn sets_app_version(content: &str) -> bool {
    serde_yaml::from_str::<serde_yaml::Value>(content)
        .map(|doc| doc.get("app_version").is_some())
        .unwrap_or(false)
}

/// Gets the path to the configuration file
pub fn get_config_path() -> Result<PathBuf> {
    // Check if MODEST_CONFIG environment variable is set
    if let Ok(path) = std::env::var("MODEST_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.modest.config
    let home_dir = dirs::home_dir().ok_or_else(|| ModestError::Config {
        path: PathBuf::from("~"),
        message: "failed to determine home directory".to_string(),
    })?;

    Ok(home_dir.join(".modest.config"))
}
