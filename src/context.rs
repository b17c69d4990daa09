//! Rendering context for one run.
//!
//! The context is a flat namespace built in three layers: ambient project metadata,
//! then every activated module's fields in activation order, then derived values
//! used by template conditionals.

use crate::config::{FieldValue, ProjectMetadata};
use crate::constants::{ambient, owners};
use crate::error::{Error, Result};
use crate::module::{Registry, Stack};
use crate::renderer::filters::to_camel_case;
use crate::resolver::{ActivatedModule, ActivationSet};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A secret-bearing field of an activated module.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretBinding {
    pub module_id: String,
    pub field: String,
    /// Environment variable the field resolves to in templates
    pub env: String,
    /// Literal value found in the configuration, never exposed to templates
    pub literal: Option<String>,
}

/// Who last set a context key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Owner {
    /// Ambient or derived default that no module has overridden yet
    Default(&'static str),
    Module(String),
}

impl Owner {
    fn name(&self) -> &str {
        match self {
            Owner::Default(name) => name,
            Owner::Module(id) => id,
        }
    }
}

/// The merged key/value namespace templates are rendered against.
#[derive(Debug, Clone, Default)]
pub struct RenderingContext {
    values: Map<String, Value>,
    owners: IndexMap<String, Owner>,
    secrets: Vec<SecretBinding>,
}

impl RenderingContext {
    /// Wraps a JSON object as an ambient-only context.
    ///
    /// Non-object values produce an empty context.
    pub fn from_json(value: Value) -> Self {
        let mut context = Self::default();
        if let Value::Object(map) = value {
            for (key, value) in map {
                context.insert_default(key, value, owners::AMBIENT);
            }
        }
        context
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Name of the module (or `<ambient>` / `<derived>`) that set `key`.
    pub fn owner_of(&self, key: &str) -> Option<&str> {
        self.owners.get(key).map(Owner::name)
    }

    pub fn secrets(&self) -> &[SecretBinding] {
        &self.secrets
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone())
    }

    fn insert_default(&mut self, key: String, value: Value, owner: &'static str) {
        self.owners.insert(key.clone(), Owner::Default(owner));
        self.values.insert(key, value);
    }

    /// Sets a module field, enforcing the single-override rule.
    fn insert_module_key(&mut self, key: &str, value: Value, module_id: &str) -> Result<()> {
        match self.owners.get(key) {
            Some(Owner::Module(owner)) => {
                return Err(Error::ContextKeyCollision {
                    key: key.to_string(),
                    owner: owner.clone(),
                    module_id: module_id.to_string(),
                });
            }
            Some(Owner::Default(owner)) => {
                log::debug!("Module '{module_id}' overrides {owner} key '{key}'");
            }
            None => {}
        }
        self.owners.insert(key.to_string(), Owner::Module(module_id.to_string()));
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Sets a derived value unless a module already provided the key.
    fn insert_derived(&mut self, key: String, value: Value) {
        if let Some(owner) = self.owners.get(&key) {
            log::debug!("Derived key '{key}' keeps the value set by {}", owner.name());
            return;
        }
        self.insert_default(key, value, owners::DERIVED);
    }
}

/// Builds the [`RenderingContext`] of a run from its activation set.
pub struct ContextBuilder<'a> {
    registry: &'a Registry,
    project: &'a ProjectMetadata,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(registry: &'a Registry, project: &'a ProjectMetadata) -> Self {
        Self { registry, project }
    }

    pub fn build(&self, activation: &ActivationSet<'_>) -> Result<RenderingContext> {
        let mut context = self.ambient();

        for module in activation.modules() {
            self.merge_module(&mut context, module)?;
        }

        self.derive(&mut context, activation);
        log::debug!("Rendering context has {} key(s)", context.values.len());
        Ok(context)
    }

    fn ambient(&self) -> RenderingContext {
        let mut context = RenderingContext::default();
        context.insert_default(
            ambient::PROJECT_NAME.to_string(),
            Value::String(self.project.name.clone()),
            owners::AMBIENT,
        );
        context.insert_default(
            ambient::BASE_PACKAGE.to_string(),
            Value::String(self.project.base_package.clone()),
            owners::AMBIENT,
        );
        context.insert_default(
            ambient::PACKAGE_PATH.to_string(),
            Value::String(self.project.package_path()),
            owners::AMBIENT,
        );
        for (key, value) in &self.project.extra {
            context.insert_default(key.clone(), value.into(), owners::AMBIENT);
        }
        context
    }

    fn merge_module(
        &self,
        context: &mut RenderingContext,
        module: &ActivatedModule<'_>,
    ) -> Result<()> {
        let module_id = module.module_id();
        let config = &module.config;

        for (field, spec) in &module.descriptor.fields {
            if spec.required && spec.default.is_none() && !config.field_values.contains_key(field)
            {
                return Err(Error::MissingRequiredField {
                    module_id: module_id.to_string(),
                    field: field.clone(),
                });
            }
        }

        // Secret fields always resolve to their env var name, configured or not.
        for (field, env) in module.descriptor.secret_fields() {
            context.secrets.push(SecretBinding {
                module_id: module_id.to_string(),
                field: field.to_string(),
                env: env.to_string(),
                literal: config
                    .field_values
                    .get(field)
                    .and_then(FieldValue::as_str)
                    .map(str::to_string),
            });
            context.insert_module_key(field, Value::String(env.to_string()), module_id)?;
        }

        for (field, value) in module.descriptor.effective_fields(config) {
            let is_secret =
                module.descriptor.fields.get(&field).is_some_and(|spec| spec.secret.is_some());
            if !is_secret {
                context.insert_module_key(&field, Value::from(&value), module_id)?;
            }
        }
        Ok(())
    }

    fn derive(&self, context: &mut RenderingContext, activation: &ActivationSet<'_>) {
        let active = activation.providers();
        let by_stack = |stack: Stack| -> Value {
            active
                .iter()
                .filter(|p| self.registry.stack_of(p) == Some(stack))
                .map(|p| Value::String(p.to_string()))
                .collect()
        };
        let backends = by_stack(Stack::Backend);
        let multi_backend = backends.as_array().is_some_and(|b| b.len() > 1);

        context.insert_derived(
            "activeProviders".to_string(),
            active.iter().map(|p| Value::String(p.to_string())).collect(),
        );
        context.insert_derived("backendProviders".to_string(), backends);
        context.insert_derived("frontendProviders".to_string(), by_stack(Stack::Frontend));
        context.insert_derived("cloudProviders".to_string(), by_stack(Stack::Cloud));
        context.insert_derived("multiBackend".to_string(), Value::Bool(multi_backend));

        for (provider, _) in self.registry.providers() {
            context.insert_derived(
                format!("{}Active", to_camel_case(provider)),
                Value::Bool(active.contains(provider)),
            );
        }
        for descriptor in self.registry.descriptors() {
            context.insert_derived(
                format!("{}Enabled", to_camel_case(&descriptor.r#type)),
                Value::Bool(activation.is_active_type(&descriptor.r#type)),
            );
        }
        context.insert_derived(
            "activeModules".to_string(),
            activation.module_ids().map(|id| Value::String(id.to_string())).collect(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Kind, ModuleConfig};
    use crate::renderer::MiniJinjaRenderer;
    use crate::resolver::DependencyResolver;
    use serde_json::json;

    const AUTH: &str = r#"
type: auth
kind: extension
supported_providers: [spring, react, drf]
fields:
  authProjectId: { type: str, required: true }
  authSecret: { type: str, secret: { env: AUTH_SECRET } }
  roleClaimKey: { type: str, default: roles }
  projectName: { type: str }
"#;

    const AUDIT: &str = r#"
type: audit
kind: extension
supported_providers: [spring]
fields:
  roleClaimKey: { type: str, default: groups }
"#;

    const BRANDING: &str = r#"
type: branding
kind: extension
supported_providers: [spring]
fields:
  projectName: { type: str }
  springActive: { type: bool }
"#;

    fn registry() -> Registry {
        let catalog = serde_yaml::from_str(
            "spring: backend\ndrf: backend\nreact: frontend\naws: cloud\n",
        )
        .unwrap();
        let mut registry = Registry::new(catalog);
        registry.register(serde_yaml::from_str(AUTH).unwrap()).unwrap();
        registry.register(serde_yaml::from_str(AUDIT).unwrap()).unwrap();
        registry.register(serde_yaml::from_str(BRANDING).unwrap()).unwrap();
        registry
    }

    fn build(requested: &[ModuleConfig], project: &ProjectMetadata) -> Result<RenderingContext> {
        let registry = registry();
        let engine = MiniJinjaRenderer::new();
        let activation = DependencyResolver::new(&registry, &engine).resolve(requested)?;
        ContextBuilder::new(&registry, project).build(&activation)
    }

    fn auth(providers: &[&str]) -> ModuleConfig {
        ModuleConfig::new("auth", Kind::Extension, "auth")
            .with_providers(providers.iter().copied())
            .with_field("authProjectId", "project-test-xxxxx")
    }

    #[test]
    fn ambient_and_module_fields_are_merged() {
        let context = build(&[auth(&["spring"])], &ProjectMetadata::default()).unwrap();
        assert_eq!(context.get("packagePath"), Some(&json!("com/example")));
        assert_eq!(context.get("authProjectId"), Some(&json!("project-test-xxxxx")));
        assert_eq!(context.get("roleClaimKey"), Some(&json!("roles")));
        assert_eq!(context.owner_of("roleClaimKey"), Some("auth"));
        assert_eq!(context.owner_of("basePackage"), Some("<ambient>"));
    }

    #[test]
    fn missing_required_field_fails() {
        let mut config = auth(&["spring"]);
        config.field_values.clear();
        let err = build(&[config], &ProjectMetadata::default()).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { field, .. } if field == "authProjectId"));
    }

    #[test]
    fn modules_may_override_ambient_keys_once() {
        let config = auth(&["spring"]).with_field("projectName", "portal");
        let context = build(&[config], &ProjectMetadata::default()).unwrap();
        assert_eq!(context.get("projectName"), Some(&json!("portal")));
        assert_eq!(context.owner_of("projectName"), Some("auth"));
    }

    #[test]
    fn a_second_override_of_an_ambient_key_collides() {
        let branding = ModuleConfig::new("zz-branding", Kind::Extension, "branding")
            .with_providers(["spring"])
            .with_field("projectName", "shop");
        let requested = [auth(&["spring"]).with_field("projectName", "portal"), branding];
        let err = build(&requested, &ProjectMetadata::default()).unwrap_err();
        match err {
            Error::ContextKeyCollision { key, owner, module_id } => {
                assert_eq!(key, "projectName");
                assert_eq!(owner, "auth");
                assert_eq!(module_id, "zz-branding");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn derived_keys_never_replace_module_values() {
        let branding = ModuleConfig::new("branding", Kind::Extension, "branding")
            .with_providers(["spring"])
            .with_field("springActive", false);
        let context = build(&[branding], &ProjectMetadata::default()).unwrap();
        assert_eq!(context.get("springActive"), Some(&json!(false)));
        assert_eq!(context.owner_of("springActive"), Some("branding"));
        assert_eq!(context.get("activeProviders"), Some(&json!(["spring"])));
    }

    #[test]
    fn two_modules_setting_one_key_collide() {
        let audit = ModuleConfig::new("zz-audit", Kind::Extension, "audit")
            .with_providers(["spring"]);
        let err = build(&[auth(&["spring"]), audit], &ProjectMetadata::default()).unwrap_err();
        match err {
            Error::ContextKeyCollision { key, owner, module_id } => {
                assert_eq!(key, "roleClaimKey");
                assert_eq!(owner, "auth");
                assert_eq!(module_id, "zz-audit");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn secrets_resolve_to_their_environment_variable() {
        let config = auth(&["spring"]).with_field("authSecret", "secret-live-abc");
        let context = build(&[config], &ProjectMetadata::default()).unwrap();
        assert_eq!(context.get("authSecret"), Some(&json!("AUTH_SECRET")));
        assert!(!context.to_json().to_string().contains("secret-live-abc"));
        assert_eq!(context.secrets()[0].literal.as_deref(), Some("secret-live-abc"));
    }

    #[test]
    fn unconfigured_secrets_still_name_their_variable() {
        let context = build(&[auth(&["spring"])], &ProjectMetadata::default()).unwrap();
        assert_eq!(context.get("authSecret"), Some(&json!("AUTH_SECRET")));
        assert_eq!(context.secrets()[0].literal, None);
    }

    #[test]
    fn derived_values_describe_the_active_stacks() {
        let context =
            build(&[auth(&["spring", "drf", "react"])], &ProjectMetadata::default()).unwrap();
        assert_eq!(context.get("activeProviders"), Some(&json!(["spring", "drf", "react"])));
        assert_eq!(context.get("backendProviders"), Some(&json!(["spring", "drf"])));
        assert_eq!(context.get("frontendProviders"), Some(&json!(["react"])));
        assert_eq!(context.get("cloudProviders"), Some(&json!([])));
        assert_eq!(context.get("multiBackend"), Some(&json!(true)));
        assert_eq!(context.get("springActive"), Some(&json!(true)));
        assert_eq!(context.get("awsActive"), Some(&json!(false)));
        assert_eq!(context.get("authEnabled"), Some(&json!(true)));
        assert_eq!(context.get("auditEnabled"), Some(&json!(false)));
        assert_eq!(context.owner_of("multiBackend"), Some("<derived>"));
    }

    #[test]
    fn building_twice_gives_identical_contexts() {
        let project = ProjectMetadata::default();
        let first = build(&[auth(&["react", "spring"])], &project).unwrap();
        let second = build(&[auth(&["react", "spring"])], &project).unwrap();
        assert_eq!(first.to_json(), second.to_json());
    }
}
