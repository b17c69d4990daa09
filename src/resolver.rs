//! Dependency resolution: turns the requested modules into an ordered activation set

use crate::config::ModuleConfig;
use crate::error::{Error, Result};
use crate::module::{ModuleDescriptor, Registry};
use crate::renderer::TemplateRenderer;
use indexmap::IndexSet;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// A module instance selected for rendering, paired with its descriptor.
#[derive(Debug, Clone)]
pub struct ActivatedModule<'r> {
    pub config: ModuleConfig,
    pub descriptor: &'r ModuleDescriptor,
    /// Pulled in as a dependency rather than requested
    pub implicit: bool,
}

impl ActivatedModule<'_> {
    pub fn module_id(&self) -> &str {
        &self.config.module_id
    }

    /// Effective field values as a JSON object, for evaluating expressions.
    pub fn fields_json(&self) -> serde_json::Value {
        let fields = self.descriptor.effective_fields(&self.config);
        serde_json::Value::Object(
            fields.iter().map(|(key, value)| (key.clone(), value.into())).collect(),
        )
    }
}

/// One (module, provider) pair of the activation set.
#[derive(Debug, Clone, Copy)]
pub struct ActivationEntry<'a, 'r> {
    /// Position in activation order; later entries win output path overrides
    pub order: usize,
    pub module: &'a ActivatedModule<'r>,
    pub provider: &'a str,
}

/// The resolved, dependency-ordered modules of one run. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct ActivationSet<'r> {
    modules: Vec<ActivatedModule<'r>>,
}

impl<'r> ActivationSet<'r> {
    pub fn modules(&self) -> &[ActivatedModule<'r>] {
        &self.modules
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.module_id())
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.module_ids().any(|id| id == module_id)
    }

    pub fn is_active_type(&self, module_type: &str) -> bool {
        self.modules.iter().any(|m| m.config.r#type == module_type)
    }

    /// Expands every module into one entry per active provider, in activation order.
    pub fn entries(&self) -> Vec<ActivationEntry<'_, 'r>> {
        self.modules
            .iter()
            .flat_map(|module| {
                module.config.providers.iter().map(move |provider| (module, provider))
            })
            .enumerate()
            .map(|(order, (module, provider))| ActivationEntry {
                order,
                module,
                provider: provider.as_str(),
            })
            .collect()
    }

    /// Union of all active providers in order of first appearance.
    pub fn providers(&self) -> IndexSet<&str> {
        self.modules
            .iter()
            .flat_map(|m| m.config.providers.iter().map(String::as_str))
            .collect()
    }
}

/// Resolves requested modules against the registry.
///
/// Resolution is a pure function of the requested modules and the registry.
pub struct DependencyResolver<'r> {
    registry: &'r Registry,
    engine: &'r dyn TemplateRenderer,
}

impl<'r> DependencyResolver<'r> {
    pub fn new(registry: &'r Registry, engine: &'r dyn TemplateRenderer) -> Self {
        Self { registry, engine }
    }

    /// Builds the activation set for `requested`.
    ///
    /// Disabled modules are dropped, dependencies that were not requested are
    /// instantiated from their descriptor defaults, and the result is sorted so that
    /// every module comes after the modules it depends on. Independent modules are
    /// ordered by ascending module id.
    pub fn resolve(&self, requested: &[ModuleConfig]) -> Result<ActivationSet<'r>> {
        let mut seen_ids = HashSet::new();
        for config in requested {
            if !seen_ids.insert(config.module_id.as_str()) {
                return Err(Error::DuplicateModuleId { module_id: config.module_id.clone() });
            }
        }

        let mut modules = Vec::new();
        for config in requested.iter().filter(|c| c.enabled) {
            let descriptor = self.lookup(&config.module_id, &config.r#type)?;
            descriptor.validate_config(config)?;
            modules.push(ActivatedModule {
                config: config.clone(),
                descriptor,
                implicit: false,
            });
        }
        let disabled: HashSet<&str> =
            requested.iter().filter(|c| !c.enabled).map(|c| c.r#type.as_str()).collect();

        let edges = self.close_over_dependencies(&mut modules, &disabled)?;
        let order = topological_order(&modules, &edges)?;

        let mut slots: Vec<Option<ActivatedModule<'r>>> =
            modules.into_iter().map(Some).collect();
        let modules: Vec<_> = order.into_iter().filter_map(|i| slots[i].take()).collect();

        log::debug!(
            "Resolved activation order: {}",
            modules.iter().map(|m| m.module_id()).collect::<Vec<_>>().join(", ")
        );
        Ok(ActivationSet { modules })
    }

    fn lookup(&self, module_id: &str, module_type: &str) -> Result<&'r ModuleDescriptor> {
        self.registry.descriptor(module_type).ok_or_else(|| Error::UnknownModuleType {
            module_id: module_id.to_string(),
            module_type: module_type.to_string(),
        })
    }

    /// Adds implicit dependency instances until the set is closed and returns, per
    /// module index, the indices of the modules it depends on.
    fn close_over_dependencies(
        &self,
        modules: &mut Vec<ActivatedModule<'r>>,
        disabled: &HashSet<&str>,
    ) -> Result<Vec<IndexSet<usize>>> {
        let mut edges: Vec<IndexSet<usize>> = vec![IndexSet::new(); modules.len()];
        let mut queue: VecDeque<usize> = (0..modules.len()).collect();

        while let Some(index) = queue.pop_front() {
            let descriptor = modules[index].descriptor;
            let fields = modules[index].fields_json();
            let dependent_id = modules[index].config.module_id.clone();
            let dependent_providers = modules[index].config.providers.clone();

            for dependency in &descriptor.depends_on {
                if let Some(expr) = &dependency.when {
                    if !self.engine.execute_expression(expr, &fields)? {
                        log::trace!(
                            "Skipping dependency '{}' of '{dependent_id}': '{expr}' is false",
                            dependency.module_type
                        );
                        continue;
                    }
                }

                let existing: Vec<usize> = modules
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.config.r#type == dependency.module_type)
                    .map(|(i, _)| i)
                    .collect();

                if existing.is_empty() {
                    let target = self.instantiate(
                        &dependent_id,
                        &dependency.module_type,
                        disabled,
                        &dependent_providers,
                    )?;
                    if seen_id(modules, target.module_id()) {
                        return Err(Error::DuplicateModuleId {
                            module_id: target.config.module_id.clone(),
                        });
                    }
                    log::debug!(
                        "Activating '{}' with defaults, required by '{dependent_id}'",
                        target.module_id()
                    );
                    modules.push(target);
                    edges.push(IndexSet::new());
                    edges[index].insert(modules.len() - 1);
                    queue.push_back(modules.len() - 1);
                    continue;
                }

                for target in existing {
                    edges[index].insert(target);
                    if modules[target].implicit
                        && inherit_providers(&mut modules[target], &dependent_providers)
                    {
                        queue.push_back(target);
                    }
                }
            }
        }

        Ok(edges)
    }

    fn instantiate(
        &self,
        dependent_id: &str,
        module_type: &str,
        disabled: &HashSet<&str>,
        inherited: &IndexSet<String>,
    ) -> Result<ActivatedModule<'r>> {
        let missing = |reason: &str| Error::MissingDependencyConfig {
            module_id: dependent_id.to_string(),
            dependency: module_type.to_string(),
            reason: reason.to_string(),
        };

        if disabled.contains(module_type) {
            return Err(missing("it is explicitly disabled"));
        }
        let descriptor = self.lookup(dependent_id, module_type)?;
        let config = descriptor
            .default_instance(inherited.iter())
            .ok_or_else(|| missing("its descriptor declares no default instantiation"))?;

        Ok(ActivatedModule { config, descriptor, implicit: true })
    }
}

fn seen_id(modules: &[ActivatedModule<'_>], module_id: &str) -> bool {
    modules.iter().any(|m| m.module_id() == module_id)
}

/// Extends an implicit module's providers with those of a new dependent.
///
/// Returns whether anything was added. Modules with fixed providers never change.
fn inherit_providers(module: &mut ActivatedModule<'_>, inherited: &IndexSet<String>) -> bool {
    let fixed = module
        .descriptor
        .instantiation
        .as_ref()
        .is_some_and(|policy| policy.providers.is_some());
    if fixed {
        return false;
    }

    let before = module.config.providers.len();
    for provider in inherited {
        if module.descriptor.supported_providers.contains(provider) {
            module.config.providers.insert(provider.clone());
        }
    }
    module.config.providers.len() != before
}

/// Kahn's algorithm with ascending module id as the tie-break.
fn topological_order(
    modules: &[ActivatedModule<'_>],
    edges: &[IndexSet<usize>],
) -> Result<Vec<usize>> {
    let mut remaining: Vec<usize> = edges.iter().map(IndexSet::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); modules.len()];
    for (dependent, targets) in edges.iter().enumerate() {
        for &target in targets {
            dependents[target].push(dependent);
        }
    }

    let mut ready: BTreeMap<&str, usize> = remaining
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(i, _)| (modules[i].module_id(), i))
        .collect();
    let mut order = Vec::with_capacity(modules.len());

    while let Some((_, index)) = ready.pop_first() {
        order.push(index);
        for &dependent in &dependents[index] {
            remaining[dependent] -= 1;
            if remaining[dependent] == 0 {
                ready.insert(modules[dependent].module_id(), dependent);
            }
        }
    }

    if order.len() != modules.len() {
        let cycle = find_cycle(modules, edges, &remaining);
        return Err(Error::CyclicDependency { cycle });
    }
    Ok(order)
}

/// Walks dependency edges among the unsorted modules until a module repeats.
fn find_cycle(
    modules: &[ActivatedModule<'_>],
    edges: &[IndexSet<usize>],
    remaining: &[usize],
) -> Vec<String> {
    let stuck: BTreeMap<&str, usize> = remaining
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(i, _)| (modules[i].module_id(), i))
        .collect();

    let Some((_, &start)) = stuck.iter().next() else {
        return Vec::new();
    };

    // Every stuck module has at least one stuck dependency, so this walk must loop.
    let mut path: IndexSet<usize> = IndexSet::new();
    let mut current = start;
    while !path.contains(&current) {
        path.insert(current);
        current = edges[current]
            .iter()
            .copied()
            .filter(|next| remaining[*next] > 0)
            .min_by_key(|next| modules[*next].module_id())
            .unwrap_or(current);
    }

    let from = path.get_index_of(&current).unwrap_or(0);
    let mut cycle: Vec<String> = path
        .iter()
        .skip(from)
        .map(|&i| modules[i].module_id().to_string())
        .collect();
    cycle.push(modules[current].module_id().to_string());
    cycle
}
