//! One generation run: resolve, build the context, assemble.
//!
//! A run moves through `Configured -> Resolved -> ContextBuilt -> Assembled -> Done`
//! exactly once, or stops in `Failed` at the first error.

use std::fmt::Display;

use crate::config::{ModuleConfig, ProjectMetadata};
use crate::context::{ContextBuilder, RenderingContext};
use crate::error::{ErrorKind, Result};
use crate::module::Registry;
use crate::renderer::TemplateRenderer;
use crate::resolver::DependencyResolver;
use crate::template::{FileSet, FileTreeAssembler, TemplateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Configured,
    Resolved,
    ContextBuilt,
    Assembled,
    Done,
    Failed(ErrorKind),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed(_))
    }
}

impl Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Configured => write!(f, "configured"),
            RunState::Resolved => write!(f, "resolved"),
            RunState::ContextBuilt => write!(f, "context built"),
            RunState::Assembled => write!(f, "assembled"),
            RunState::Done => write!(f, "done"),
            RunState::Failed(kind) => write!(f, "failed ({kind})"),
        }
    }
}

/// Output of a successful run.
#[derive(Debug, Clone)]
pub struct Generation {
    pub files: FileSet,
    /// Activated module ids in activation order, implicit dependencies included
    pub activated: Vec<String>,
    pub context: RenderingContext,
}

/// The states a run went through and how it ended.
#[derive(Debug)]
pub struct RunOutcome {
    pub history: Vec<RunState>,
    pub result: Result<Generation>,
}

impl RunOutcome {
    /// Terminal state of the run.
    pub fn state(&self) -> RunState {
        self.history.last().copied().unwrap_or(RunState::Configured)
    }

    pub fn into_result(self) -> Result<Generation> {
        self.result
    }
}

struct Transitions {
    history: Vec<RunState>,
}

impl Transitions {
    fn new() -> Self {
        log::debug!("Run state: {}", RunState::Configured);
        Self { history: vec![RunState::Configured] }
    }

    fn advance<T>(&mut self, next: RunState, step: Result<T>) -> Result<T> {
        let state = match &step {
            Ok(_) => next,
            Err(err) => RunState::Failed(err.kind()),
        };
        log::debug!("Run state: {state}");
        self.history.push(state);
        step
    }
}

/// Runs generations against a shared registry and template store.
///
/// The generator holds only shared references, so one instance can serve
/// concurrent runs.
pub struct Generator<'a> {
    registry: &'a Registry,
    store: &'a dyn TemplateStore,
    engine: &'a dyn TemplateRenderer,
}

impl<'a> Generator<'a> {
    pub fn new(
        registry: &'a Registry,
        store: &'a dyn TemplateStore,
        engine: &'a dyn TemplateRenderer,
    ) -> Self {
        Self { registry, store, engine }
    }

    pub fn run(&self, project: &ProjectMetadata, modules: &[ModuleConfig]) -> RunOutcome {
        let mut transitions = Transitions::new();
        let result = self.run_steps(&mut transitions, project, modules);
        RunOutcome { history: transitions.history, result }
    }

    /// Shorthand for [`Generator::run`] when the state history is not needed.
    pub fn generate(
        &self,
        project: &ProjectMetadata,
        modules: &[ModuleConfig],
    ) -> Result<Generation> {
        self.run(project, modules).into_result()
    }

    fn run_steps(
        &self,
        transitions: &mut Transitions,
        project: &ProjectMetadata,
        modules: &[ModuleConfig],
    ) -> Result<Generation> {
        let resolver = DependencyResolver::new(self.registry, self.engine);
        let activation = transitions.advance(RunState::Resolved, resolver.resolve(modules))?;

        let builder = ContextBuilder::new(self.registry, project);
        let context =
            transitions.advance(RunState::ContextBuilt, builder.build(&activation))?;

        let assembler = FileTreeAssembler::new(self.registry, self.store, self.engine);
        let files = transitions
            .advance(RunState::Assembled, assembler.assemble(&activation, &context))?;

        let activated = activation.module_ids().map(str::to_string).collect();
        log::info!(
            "Generated {} file(s) from {} module(s)",
            files.len(),
            activation.modules().len()
        );
        transitions.advance(RunState::Done, Ok(Generation { files, activated, context }))
    }
}
