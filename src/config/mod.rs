//! Configuration management for Genesis runs
//!
//! This module contains the configuration system components:
//! - `types`: module instances, field values and project metadata
//! - `loader`: configuration file discovery and parsing

pub mod loader;
pub mod types;

pub use loader::ProjectConfig;
pub use types::{FieldValue, Kind, ModuleConfig, ProjectMetadata};
