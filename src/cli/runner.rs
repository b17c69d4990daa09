use crate::{
    cli::{CheckArgs, Cli, Commands, GenerateArgs},
    config::ProjectConfig,
    engine::Generator,
    error::Result,
    module::Registry,
    renderer::MiniJinjaRenderer,
    template::MemoryTemplateStore,
    verify::{ScenarioSuite, Verifier},
    writer::FileWriter,
};
use std::path::{Path, PathBuf};

/// Main CLI runner: loads the registry once and dispatches the subcommand.
pub struct Runner {
    registry: Registry,
    store: MemoryTemplateStore,
    engine: MiniJinjaRenderer,
}

impl Runner {
    /// Loads descriptors and templates from `registry_root`.
    pub fn new<P: AsRef<Path>>(registry_root: P) -> Result<Self> {
        let registry_root = registry_root.as_ref();
        log::debug!("Loading module registry from '{}'", registry_root.display());
        let registry = Registry::load(registry_root)?;
        let store = MemoryTemplateStore::load(registry_root)?;
        log::debug!(
            "Loaded {} module type(s) and {} template(s)",
            registry.descriptors().count(),
            store.len()
        );
        Ok(Self { registry, store, engine: MiniJinjaRenderer::new() })
    }

    fn generator(&self) -> Generator<'_> {
        Generator::new(&self.registry, &self.store, &self.engine)
    }

    /// Generates a project and writes it under the output directory.
    pub fn generate(&self, args: &GenerateArgs) -> Result<PathBuf> {
        let writer = FileWriter::new(&args.output_dir, args.force, args.dry_run)?;
        let config = ProjectConfig::load(&args.config_dir)?;

        let generation = self.generator().generate(&config.project, &config.modules)?;
        let written = writer.write_all(&generation.files)?;
        log::info!("Activated modules: {}", generation.activated.join(", "));

        if args.dry_run {
            let target = args.output_dir.display();
            println!("[DRY RUN] {written} file(s) would be written to {target}.");
        } else {
            println!("Generated {written} file(s) in {}.", writer.output_root().display());
        }
        Ok(writer.output_root().to_path_buf())
    }

    /// Runs a scenario file and prints the report; fails when any check failed.
    pub fn check(&self, args: &CheckArgs) -> Result<()> {
        let suite = ScenarioSuite::from_file(&args.scenario_file)?;
        log::info!(
            "Checking '{}' ({} scenario(s))",
            suite.module_id,
            suite.scenarios.len()
        );

        let verifier = Verifier::new(self.generator(), &self.store);
        let report = verifier.verify_suite(&suite);
        println!("{report}");
        report.into_result()
    }
}

/// Main entry point for CLI execution
pub fn run(cli: Cli) -> Result<()> {
    let runner = Runner::new(&cli.registry)?;
    match &cli.command {
        Commands::Generate(args) => runner.generate(args).map(|_| ()),
        Commands::Check(args) => runner.check(args),
    }
}
