//! Module descriptors: the schema, dependencies and templates of a module type

use crate::config::{FieldValue, Kind, ModuleConfig};
use crate::error::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::fmt::Display;

/// Declared type of a module field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Str,
    Bool,
    Int,
    Float,
}

impl FieldType {
    pub fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldType::Str, FieldValue::Str(_))
                | (FieldType::Bool, FieldValue::Bool(_))
                | (FieldType::Int, FieldValue::Int(_))
                | (FieldType::Float, FieldValue::Float(_) | FieldValue::Int(_))
        )
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FieldType::Str => "str",
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Float => "float",
        };
        write!(f, "{s}")
    }
}

/// Marks a field as secret-bearing. Templates only ever see `env`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecretSpec {
    pub env: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub r#type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<FieldValue>,
    #[serde(default)]
    pub secret: Option<SecretSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum DependencyDecl {
    Short(String),
    Full {
        #[serde(rename = "type")]
        module_type: String,
        #[serde(default)]
        when: Option<String>,
    },
}

/// An edge in the dependency graph, optionally gated by an expression over the
/// dependent module's fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "DependencyDecl")]
pub struct Dependency {
    pub module_type: String,
    pub when: Option<String>,
}

impl From<DependencyDecl> for Dependency {
    fn from(decl: DependencyDecl) -> Self {
        match decl {
            DependencyDecl::Short(module_type) => Self { module_type, when: None },
            DependencyDecl::Full { module_type, when } => Self { module_type, when },
        }
    }
}

/// How a module is instantiated when another module pulls it in implicitly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Instantiation {
    /// Fixed providers; when absent the providers of the dependents are inherited.
    #[serde(default)]
    pub providers: Option<IndexSet<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateRef {
    pub provider: String,
    /// Logical template path, relative to the provider's template directory
    #[serde(rename = "source")]
    pub source_path: String,
    /// Output path, may embed context variables
    #[serde(rename = "output")]
    pub output_path_pattern: String,
    /// Eligibility expression evaluated against the rendering context
    #[serde(default)]
    pub when: Option<String>,
    /// Another exclusive writer of the same output path is a conflict
    #[serde(default)]
    pub exclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleDescriptor {
    #[serde(rename = "type")]
    pub r#type: String,
    pub kind: Kind,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub supported_providers: IndexSet<String>,
    #[serde(default)]
    pub depends_on: Vec<Dependency>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,
    #[serde(default)]
    pub templates: Vec<TemplateRef>,
    #[serde(default)]
    pub instantiation: Option<Instantiation>,
}

impl ModuleDescriptor {
    /// Checks the descriptor for internal consistency.
    ///
    /// # Arguments
    /// * `origin` - Where the descriptor came from, used in error messages
    pub fn validate(&self, origin: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidDescriptor {
            path: origin.to_string(),
            reason,
        };

        for template in &self.templates {
            if !self.supported_providers.contains(&template.provider) {
                return Err(invalid(format!(
                    "template '{}' targets unsupported provider '{}'",
                    template.source_path, template.provider
                )));
            }
        }

        for (name, spec) in &self.fields {
            if let Some(default) = &spec.default {
                if !spec.r#type.accepts(default) {
                    return Err(invalid(format!(
                        "default of field '{name}' is not a {} value",
                        spec.r#type
                    )));
                }
            }
            if spec.secret.is_some() && spec.r#type != FieldType::Str {
                return Err(invalid(format!("secret field '{name}' must be a str field")));
            }
        }

        if let Some(providers) =
            self.instantiation.as_ref().and_then(|i| i.providers.as_ref())
        {
            if let Some(p) = providers.iter().find(|p| !self.supported_providers.contains(*p)) {
                return Err(invalid(format!(
                    "instantiation selects unsupported provider '{p}'"
                )));
            }
        }

        Ok(())
    }

    /// Validates a module instance against this descriptor's schema.
    ///
    /// Unknown fields, mistyped values and unsupported providers are rejected here,
    /// before anything is rendered. Missing required fields are reported later, when
    /// the rendering context is built, because defaults may still apply.
    pub fn validate_config(&self, config: &ModuleConfig) -> Result<()> {
        for (field, value) in &config.field_values {
            let spec = self.fields.get(field).ok_or_else(|| Error::UnknownField {
                module_id: config.module_id.clone(),
                module_type: self.r#type.clone(),
                field: field.clone(),
            })?;
            if !spec.r#type.accepts(value) {
                return Err(Error::FieldTypeMismatch {
                    module_id: config.module_id.clone(),
                    field: field.clone(),
                    expected: spec.r#type.to_string(),
                });
            }
        }

        if let Some(provider) =
            config.providers.iter().find(|p| !self.supported_providers.contains(*p))
        {
            return Err(Error::UnsupportedProvider {
                module_id: config.module_id.clone(),
                module_type: self.r#type.clone(),
                provider: provider.clone(),
            });
        }

        Ok(())
    }

    /// Configured values merged over declared defaults, in schema order.
    ///
    /// Fields with neither a value nor a default are left out.
    pub fn effective_fields(&self, config: &ModuleConfig) -> IndexMap<String, FieldValue> {
        self.fields
            .iter()
            .filter_map(|(name, spec)| {
                config
                    .field_values
                    .get(name)
                    .or(spec.default.as_ref())
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }

    /// Iterates over the secret fields and their environment variable names.
    pub fn secret_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().filter_map(|(name, spec)| {
            spec.secret.as_ref().map(|secret| (name.as_str(), secret.env.as_str()))
        })
    }

    /// Builds the instance used when this module is pulled in as a dependency.
    ///
    /// # Arguments
    /// * `inherited` - Providers of the modules that depend on this one, in order
    ///
    /// # Returns
    /// * `None` - If the descriptor declares no instantiation policy
    pub fn default_instance<'a, I>(&self, inherited: I) -> Option<ModuleConfig>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let policy = self.instantiation.as_ref()?;
        let providers: IndexSet<String> = match &policy.providers {
            Some(fixed) => fixed.clone(),
            None => inherited
                .into_iter()
                .filter(|p| self.supported_providers.contains(*p))
                .cloned()
                .collect(),
        };

        let module_id = format!("{}-{}", self.kind, self.r#type);
        let mut config = ModuleConfig::new(module_id, self.kind, self.r#type.clone());
        config.providers = providers;
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RBAC: &str = r#"
type: rbac
kind: extension
version: 1.0.0
supported_providers: [spring, drf, react]
fields:
  rbacDefaultRole: { type: str, default: USER }
  rbacAdminRole: { type: str, default: ADMIN }
templates:
  - provider: spring
    source: Role.java
    output: "backend/src/main/java/{{ packagePath }}/security/Role.java"
instantiation: {}
"#;

    fn rbac() -> ModuleDescriptor {
        serde_yaml::from_str(RBAC).unwrap()
    }

    #[test]
    fn parses_dependency_shorthand_and_full_form() {
        let deps: Vec<Dependency> =
            serde_yaml::from_str("- rbac\n- { type: audit, when: enableAudit }\n").unwrap();
        assert_eq!(deps[0], Dependency { module_type: "rbac".into(), when: None });
        assert_eq!(deps[1].module_type, "audit");
        assert_eq!(deps[1].when.as_deref(), Some("enableAudit"));
    }

    #[test]
    fn rejects_templates_for_unsupported_providers() {
        let mut descriptor = rbac();
        descriptor.templates[0].provider = "angular".into();
        let err = descriptor.validate("rbac/module.yaml").unwrap_err();
        assert!(matches!(err, Error::InvalidDescriptor { .. }));
    }

    #[test]
    fn rejects_mistyped_defaults() {
        let mut descriptor = rbac();
        descriptor.fields.get_mut("rbacAdminRole").unwrap().default =
            Some(FieldValue::Bool(true));
        assert!(descriptor.validate("rbac/module.yaml").is_err());
    }

    #[test]
    fn config_validation_catches_unknown_fields_and_types() {
        let descriptor = rbac();
        let config = ModuleConfig::new("r", Kind::Extension, "rbac")
            .with_providers(["spring"])
            .with_field("rbacColour", "blue");
        assert!(matches!(
            descriptor.validate_config(&config),
            Err(Error::UnknownField { field, .. }) if field == "rbacColour"
        ));

        let config = ModuleConfig::new("r", Kind::Extension, "rbac")
            .with_field("rbacAdminRole", true);
        assert!(matches!(
            descriptor.validate_config(&config),
            Err(Error::FieldTypeMismatch { expected, .. }) if expected == "str"
        ));

        let config =
            ModuleConfig::new("r", Kind::Extension, "rbac").with_providers(["aws"]);
        assert!(matches!(
            descriptor.validate_config(&config),
            Err(Error::UnsupportedProvider { provider, .. }) if provider == "aws"
        ));
    }

    #[test]
    fn effective_fields_apply_defaults_in_schema_order() {
        let descriptor = rbac();
        let config = ModuleConfig::new("r", Kind::Extension, "rbac")
            .with_field("rbacAdminRole", "OWNER");
        let fields = descriptor.effective_fields(&config);
        let keys: Vec<_> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, ["rbacDefaultRole", "rbacAdminRole"]);
        assert_eq!(fields["rbacAdminRole"], FieldValue::from("OWNER"));
        assert_eq!(fields["rbacDefaultRole"], FieldValue::from("USER"));
    }

    #[test]
    fn default_instance_inherits_supported_providers() {
        let descriptor = rbac();
        let inherited = ["spring".to_string(), "aws".to_string(), "react".to_string()];
        let config = descriptor.default_instance(inherited.iter()).unwrap();
        assert_eq!(config.module_id, "extension-rbac");
        assert_eq!(config.providers.iter().collect::<Vec<_>>(), ["spring", "react"]);
    }

    #[test]
    fn no_instantiation_policy_means_no_default_instance() {
        let mut descriptor = rbac();
        descriptor.instantiation = None;
        assert!(descriptor.default_instance(std::iter::empty()).is_none());
    }
}
