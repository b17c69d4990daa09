#![allow(dead_code)]

use genesis::config::{Kind, ModuleConfig, ProjectMetadata};
use genesis::engine::{Generation, Generator, RunOutcome};
use genesis::error::Result;
use genesis::module::Registry;
use genesis::renderer::MiniJinjaRenderer;
use genesis::template::MemoryTemplateStore;
use std::path::{Path, PathBuf};

/// The module registry bundled with the crate.
pub fn registry_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("modules")
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Registry, templates and renderer loaded once per test.
pub struct Harness {
    pub registry: Registry,
    pub store: MemoryTemplateStore,
    pub engine: MiniJinjaRenderer,
}

impl Harness {
    pub fn bundled() -> Self {
        let root = registry_root();
        Self {
            registry: Registry::load(&root).unwrap(),
            store: MemoryTemplateStore::load(&root).unwrap(),
            engine: MiniJinjaRenderer::new(),
        }
    }

    pub fn generator(&self) -> Generator<'_> {
        Generator::new(&self.registry, &self.store, &self.engine)
    }

    pub fn run(&self, modules: &[ModuleConfig]) -> RunOutcome {
        self.generator().run(&ProjectMetadata::default(), modules)
    }

    pub fn generate(&self, modules: &[ModuleConfig]) -> Result<Generation> {
        self.generator().generate(&ProjectMetadata::default(), modules)
    }
}

/// A stytch instance with the required fields set.
pub fn stytch(module_id: &str, providers: &[&str], enable_rbac: bool) -> ModuleConfig {
    ModuleConfig::new(module_id, Kind::Extension, "stytch")
        .with_providers(providers.iter().copied())
        .with_field("stytchProjectId", "project-test-xxxxx")
        .with_field("stytchPublicToken", "public-token-test-xxxxx")
        .with_field("enableRbac", enable_rbac)
}

/// Sorted paths of a generation, for readable assertions.
pub fn paths(generation: &Generation) -> Vec<&str> {
    generation.files.paths().collect()
}
