//! Read-only template storage addressed by (module type, provider, source path)

use crate::constants::{PATH_SEPARATOR, TEMPLATES_DIR, TEMPLATE_SUFFIX};
use crate::error::Result;
use indexmap::IndexMap;
use std::fmt::Display;
use std::path::Path;
use walkdir::WalkDir;

/// Logical identity of a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey {
    pub module_type: String,
    pub provider: String,
    pub source_path: String,
}

impl TemplateKey {
    pub fn new<S: Into<String>>(module_type: S, provider: S, source_path: S) -> Self {
        Self {
            module_type: module_type.into(),
            provider: provider.into(),
            source_path: source_path.into(),
        }
    }

    /// Parses the `<type>/<provider>/<source path>` form.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, PATH_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(p), Some(source)) if !t.is_empty() && !p.is_empty() => {
                Some(Self::new(t, p, source))
            }
            _ => None,
        }
    }
}

impl Display for TemplateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.module_type, self.provider, self.source_path)
    }
}

/// Source of template text.
///
/// Implementations must be safe to share across the render workers.
pub trait TemplateStore: Send + Sync {
    /// Returns the raw template text, if present.
    fn get(&self, key: &TemplateKey) -> Option<&str>;
}

/// Template store held fully in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryTemplateStore {
    templates: IndexMap<TemplateKey, String>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, key: TemplateKey, content: S) {
        self.templates.insert(key, content.into());
    }

    /// Loads every `<type>/templates/<provider>/**/*.j2` file below `root`.
    ///
    /// The `.j2` suffix is stripped from the logical source path. Other files are
    /// ignored.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let mut store = Self::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let segments: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();

            match segments.as_slice() {
                [module_type, templates, provider, rest @ ..]
                    if templates == TEMPLATES_DIR && !rest.is_empty() =>
                {
                    let joined = rest.join("/");
                    let Some(source_path) = joined.strip_suffix(TEMPLATE_SUFFIX) else {
                        log::trace!("Skipping non-template file {}", entry.path().display());
                        continue;
                    };
                    let key = TemplateKey::new(
                        module_type.as_str(),
                        provider.as_str(),
                        source_path,
                    );
                    let content = std::fs::read_to_string(entry.path())?;
                    log::trace!("Loaded template {key}");
                    store.insert(key, content);
                }
                _ => continue,
            }
        }

        log::debug!("Loaded {} template(s) from {}", store.len(), root.display());
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TemplateKey> {
        self.templates.keys()
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn get(&self, key: &TemplateKey) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parses_template_keys() {
        let key = TemplateKey::parse("stytch/spring/config/SecurityStytchConfig.java").unwrap();
        assert_eq!(key.module_type, "stytch");
        assert_eq!(key.provider, "spring");
        assert_eq!(key.source_path, "config/SecurityStytchConfig.java");
        assert_eq!(key.to_string(), "stytch/spring/config/SecurityStytchConfig.java");
        assert!(TemplateKey::parse("stytch/spring").is_none());
        assert!(TemplateKey::parse("/spring/a").is_none());
    }

    #[test]
    fn loads_only_suffixed_files_under_templates() {
        let root = TempDir::new().unwrap();
        let provider_dir = root.path().join("stytch/templates/react/src/providers");
        fs::create_dir_all(&provider_dir).unwrap();
        fs::write(provider_dir.join("StytchProvider.tsx.j2"), "{{ projectName }}").unwrap();
        fs::write(provider_dir.join("README.md"), "not a template").unwrap();
        fs::write(root.path().join("stytch/module.yaml"), "type: stytch").unwrap();

        let store = MemoryTemplateStore::load(root.path()).unwrap();
        assert_eq!(store.len(), 1);
        let key = TemplateKey::new("stytch", "react", "src/providers/StytchProvider.tsx");
        assert_eq!(store.get(&key), Some("{{ projectName }}"));
    }
}
