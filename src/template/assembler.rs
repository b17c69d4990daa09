use rayon::prelude::*;
use std::collections::HashMap;

use crate::context::RenderingContext;
use crate::error::{Error, Result};
use crate::module::{ModuleDescriptor, Registry, TemplateRef};
use crate::renderer::TemplateRenderer;
use crate::resolver::{ActivationEntry, ActivationSet};

use super::file::{FileSet, GeneratedFile};
use super::store::{TemplateKey, TemplateStore};

/// An eligible template paired with the activation entry it renders for.
struct RenderJob<'a, 'r> {
    entry: ActivationEntry<'a, 'r>,
    template: &'r TemplateRef,
}

impl RenderJob<'_, '_> {
    fn key(&self) -> TemplateKey {
        TemplateKey::new(
            self.entry.module.descriptor.r#type.as_str(),
            self.entry.provider,
            self.template.source_path.as_str(),
        )
    }

    fn owner(&self) -> String {
        format!("{} ({})", self.entry.module.module_id(), self.key())
    }
}

/// Decides which templates apply to a run, renders them and assembles the file set.
pub struct FileTreeAssembler<'a> {
    /// Dependencies
    registry: &'a Registry,
    store: &'a dyn TemplateStore,
    engine: &'a dyn TemplateRenderer,
}

impl<'a> FileTreeAssembler<'a> {
    pub fn new(
        registry: &'a Registry,
        store: &'a dyn TemplateStore,
        engine: &'a dyn TemplateRenderer,
    ) -> Self {
        Self { registry, store, engine }
    }

    /// Renders every eligible template of `activation` against `context`.
    ///
    /// Templates are rendered in parallel; overrides, conflicts and secret checks are
    /// applied afterwards in activation order, so the result does not depend on
    /// scheduling.
    pub fn assemble(
        &self,
        activation: &ActivationSet<'_>,
        context: &RenderingContext,
    ) -> Result<FileSet> {
        let entries = activation.entries();
        let jobs = self.eligible_jobs(&entries, context)?;
        log::debug!("Rendering {} template(s)", jobs.len());

        let rendered: Vec<Result<GeneratedFile>> =
            jobs.par_iter().map(|job| self.render_job(job, context)).collect();

        let mut files = FileSet::new();
        // Current writer per path, and the first writer that claimed it exclusively.
        let mut writers: HashMap<String, String> = HashMap::new();
        let mut exclusive_owners: HashMap<String, String> = HashMap::new();
        for (job, file) in jobs.iter().zip(rendered) {
            let file = file?;
            let owner = job.owner();
            if job.template.exclusive {
                if let Some(first) = exclusive_owners.get(&file.path) {
                    return Err(Error::OutputPathConflict {
                        path: file.path.clone(),
                        first: first.clone(),
                        second: owner,
                    });
                }
                exclusive_owners.insert(file.path.clone(), owner.clone());
            }
            if let Some(previous) = writers.insert(file.path.clone(), owner.clone()) {
                log::warn!("'{}' from {owner} overrides the output of {previous}", file.path);
            }
            files.insert(file);
        }

        self.check_secrets(&files, context)?;
        Ok(files)
    }

    /// Selects templates whose provider is active for their module and whose
    /// condition, if any, holds.
    fn eligible_jobs<'e, 'r>(
        &self,
        entries: &'e [ActivationEntry<'e, 'r>],
        context: &RenderingContext,
    ) -> Result<Vec<RenderJob<'e, 'r>>> {
        let context_json = context.to_json();
        let mut jobs = Vec::new();

        for entry in entries {
            let descriptor: &'r ModuleDescriptor = entry.module.descriptor;
            for template in &descriptor.templates {
                if template.provider != entry.provider {
                    continue;
                }
                if let Some(expr) = &template.when {
                    if !self.engine.execute_expression(expr, &context_json)? {
                        log::debug!(
                            "Skipping '{}' of '{}': '{expr}' is false",
                            template.source_path,
                            entry.module.module_id()
                        );
                        continue;
                    }
                }
                jobs.push(RenderJob { entry: *entry, template });
            }
        }

        Ok(jobs)
    }

    fn render_job(
        &self,
        job: &RenderJob<'_, '_>,
        context: &RenderingContext,
    ) -> Result<GeneratedFile> {
        let key = job.key();
        let source = self.store.get(&key).ok_or_else(|| Error::TemplateNotFound {
            module_type: key.module_type.clone(),
            provider: key.provider.clone(),
            source_path: key.source_path.clone(),
        })?;

        let name = key.to_string();
        let path = self.engine.render_path(&job.template.output_path_pattern, context, &name)?;
        let content = self.engine.render(source, context, &name)?;
        log::trace!("Rendered {name} -> {path}");

        Ok(GeneratedFile {
            path,
            content,
            module_id: job.entry.module.module_id().to_string(),
            provider: job.entry.provider.to_string(),
            template: name,
        })
    }

    /// Literal secret values may appear nowhere; client-facing files may not even
    /// name the environment variables that hold them.
    fn check_secrets(&self, files: &FileSet, context: &RenderingContext) -> Result<()> {
        for file in files.iter() {
            let client_facing = self
                .registry
                .stack_of(&file.provider)
                .is_some_and(|stack| stack.is_client_facing());

            for secret in context.secrets() {
                let literal_leak = secret
                    .literal
                    .as_deref()
                    .is_some_and(|literal| !literal.is_empty() && file.content.contains(literal));
                let env_leak = client_facing && file.content.contains(&secret.env);
                if literal_leak || env_leak {
                    return Err(Error::SecretLeak {
                        path: file.path.clone(),
                        field: secret.field.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
