//! Registry of module descriptors and the provider catalog

use crate::config::loader::parse_by_extension;
use crate::constants::{DESCRIPTOR_FILENAME, PROVIDERS_FILENAME};
use crate::error::{Error, Result};
use crate::module::descriptor::ModuleDescriptor;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt::Display;
use std::path::Path;
use walkdir::WalkDir;

/// The kind of technology stack a provider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stack {
    Backend,
    Frontend,
    Cloud,
}

impl Stack {
    /// Output rendered for this stack ships to end users.
    pub fn is_client_facing(&self) -> bool {
        matches!(self, Stack::Frontend)
    }
}

impl Display for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stack::Backend => "backend",
            Stack::Frontend => "frontend",
            Stack::Cloud => "cloud",
        };
        write!(f, "{s}")
    }
}

/// Read-only lookup of module descriptors by type.
///
/// Shared between concurrent runs; nothing mutates it after loading.
#[derive(Debug, Default)]
pub struct Registry {
    descriptors: IndexMap<String, ModuleDescriptor>,
    providers: IndexMap<String, Stack>,
}

impl Registry {
    pub fn new(providers: IndexMap<String, Stack>) -> Self {
        Self { descriptors: IndexMap::new(), providers }
    }

    /// Loads `providers.yaml` and every `module.yaml` below `root`.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let providers_file = root.join(PROVIDERS_FILENAME);
        let providers: IndexMap<String, Stack> =
            parse_by_extension(&providers_file, &std::fs::read_to_string(&providers_file)?)?;
        let mut registry = Self::new(providers);

        let mut descriptor_files = Vec::new();
        for entry in WalkDir::new(root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_name() == DESCRIPTOR_FILENAME {
                descriptor_files.push(entry.into_path());
            }
        }
        descriptor_files.sort();

        for path in descriptor_files {
            let content = std::fs::read_to_string(&path)?;
            let descriptor: ModuleDescriptor = serde_yaml::from_str(&content)?;
            registry.register_from(descriptor, &path.display().to_string())?;
        }

        log::debug!(
            "Loaded {} module descriptor(s) and {} provider(s) from {}",
            registry.descriptors.len(),
            registry.providers.len(),
            root.display()
        );
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: ModuleDescriptor) -> Result<()> {
        let origin = descriptor.r#type.clone();
        self.register_from(descriptor, &origin)
    }

    fn register_from(&mut self, descriptor: ModuleDescriptor, origin: &str) -> Result<()> {
        descriptor.validate(origin)?;

        if let Some(provider) =
            descriptor.supported_providers.iter().find(|p| !self.providers.contains_key(*p))
        {
            return Err(Error::InvalidDescriptor {
                path: origin.to_string(),
                reason: format!("provider '{provider}' is not in the provider catalog"),
            });
        }
        if self.descriptors.contains_key(&descriptor.r#type) {
            return Err(Error::InvalidDescriptor {
                path: origin.to_string(),
                reason: format!("module type '{}' is already registered", descriptor.r#type),
            });
        }

        self.descriptors.insert(descriptor.r#type.clone(), descriptor);
        Ok(())
    }

    pub fn descriptor(&self, module_type: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.get(module_type)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.descriptors.values()
    }

    pub fn stack_of(&self, provider: &str) -> Option<Stack> {
        self.providers.get(provider).copied()
    }

    /// Providers in catalog order.
    pub fn providers(&self) -> impl Iterator<Item = (&str, Stack)> {
        self.providers.iter().map(|(id, stack)| (id.as_str(), *stack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn catalog() -> IndexMap<String, Stack> {
        serde_yaml::from_str("spring: backend\nreact: frontend\naws: cloud\n").unwrap()
    }

    fn descriptor(yaml: &str) -> ModuleDescriptor {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn rejects_providers_missing_from_the_catalog() {
        let mut registry = Registry::new(catalog());
        let err = registry
            .register(descriptor("type: a\nkind: core\nsupported_providers: [vue]\n"))
            .unwrap_err();
        assert!(err.to_string().contains("'vue'"));
    }

    #[test]
    fn rejects_duplicate_types() {
        let mut registry = Registry::new(catalog());
        let yaml = "type: a\nkind: core\nsupported_providers: [spring]\n";
        registry.register(descriptor(yaml)).unwrap();
        assert!(registry.register(descriptor(yaml)).is_err());
    }

    #[test]
    fn loads_descriptors_from_directory() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("providers.yaml"), "spring: backend\nreact: frontend\n")
            .unwrap();
        for module in ["beta", "alpha"] {
            let dir = root.path().join(module);
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join("module.yaml"),
                format!("type: {module}\nkind: extension\nsupported_providers: [react]\n"),
            )
            .unwrap();
        }

        let registry = Registry::load(root.path()).unwrap();
        let types: Vec<_> = registry.descriptors().map(|d| d.r#type.as_str()).collect();
        assert_eq!(types, ["alpha", "beta"]);
        assert_eq!(registry.stack_of("react"), Some(Stack::Frontend));
        assert!(registry.stack_of("react").unwrap().is_client_facing());
        assert_eq!(registry.stack_of("drf"), None);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_module_directories_fail_the_load() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        fs::write(root.path().join("providers.yaml"), "spring: backend\n").unwrap();
        let locked = root.path().join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(
            locked.join("module.yaml"),
            "type: locked\nkind: core\nsupported_providers: [spring]\n",
        )
        .unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can still list the directory.
        let listable = fs::read_dir(&locked).is_ok();
        let result = Registry::load(root.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if listable {
            return;
        }
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
