//! Project configuration loading

use crate::config::types::{ModuleConfig, ProjectMetadata};
use crate::constants::CONFIG_FILENAMES;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// A complete scaffolding request: project metadata plus the requested modules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectMetadata,
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

impl ProjectConfig {
    /// Looks for one of [`CONFIG_FILENAMES`] inside `dir` and parses the first match.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();

        for config_file_name in CONFIG_FILENAMES.iter() {
            let config_file_path = dir.join(config_file_name);
            if config_file_path.exists() {
                log::debug!("Loading project configuration from {}", config_file_path.display());
                return Self::from_file(config_file_path);
            }
        }

        Err(Error::ConfigNotFound {
            dir: dir.display().to_string(),
            config_files: CONFIG_FILENAMES.join(", "),
        })
    }

    /// Parses a configuration file, choosing JSON or YAML by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        parse_by_extension(path, &content)
    }
}

/// Deserializes `content` as JSON when `path` ends in `.json`, YAML otherwise.
pub fn parse_by_extension<T, P>(path: P, content: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    match path.as_ref().extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(serde_json::from_str(content)?),
        _ => Ok(serde_yaml::from_str(content)?),
    }
}
