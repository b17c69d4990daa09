//! Basic types for module and project configuration

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::fmt::Display;

/// Whether a module is part of the scaffold core or an optional extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Core,
    Extension,
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Kind::Core => "core",
            Kind::Extension => "extension",
        };
        write!(f, "{s}")
    }
}

/// A single configured field value.
///
/// Only scalars are accepted; sequences and maps fail to deserialize.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&FieldValue> for serde_json::Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Int(i) => serde_json::Value::from(*i),
            FieldValue::Float(f) => serde_json::Value::from(*f),
            FieldValue::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

fn default_enabled() -> bool {
    true
}

/// One requested module instance, as written in the project configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModuleConfig {
    /// Unique id of this instance within one run
    pub module_id: String,
    pub kind: Kind,
    /// Descriptor type this instance is built from
    #[serde(rename = "type")]
    pub r#type: String,
    /// Target stacks in precedence order
    #[serde(default)]
    pub providers: IndexSet<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub field_values: IndexMap<String, FieldValue>,
}

impl ModuleConfig {
    pub fn new<S: Into<String>>(module_id: S, kind: Kind, module_type: S) -> Self {
        Self {
            module_id: module_id.into(),
            kind,
            r#type: module_type.into(),
            providers: IndexSet::new(),
            enabled: true,
            field_values: IndexMap::new(),
        }
    }

    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_field<K: Into<String>, V: Into<FieldValue>>(mut self, key: K, value: V) -> Self {
        self.field_values.insert(key.into(), value.into());
        self
    }
}

fn default_project_name() -> String {
    "app".to_string()
}

fn default_base_package() -> String {
    "com.example".to_string()
}

/// Ambient project metadata; the lowest-precedence layer of the rendering context.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    #[serde(default = "default_project_name")]
    pub name: String,
    #[serde(default = "default_base_package")]
    pub base_package: String,
    /// Additional ambient scalars exposed to templates under their own names
    #[serde(flatten)]
    pub extra: IndexMap<String, FieldValue>,
}

impl ProjectMetadata {
    /// Package path derived from the base package, e.g. `com.example` -> `com/example`.
    pub fn package_path(&self) -> String {
        self.base_package.replace('.', "/")
    }
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            base_package: default_base_package(),
            extra: IndexMap::new(),
        }
    }
}
