//! Scenario verification against generated file sets.
//!
//! A scenario file describes module configurations, the files they must produce
//! and substrings those files must or must not contain. Template validations apply
//! the same substring checks to raw template sources.

use serde::Deserialize;
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;

use crate::config::loader::parse_by_extension;
use crate::config::{ModuleConfig, ProjectMetadata};
use crate::engine::Generator;
use crate::error::{Error, Result};
use crate::template::{FileSet, TemplateKey, TemplateStore};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSuite {
    pub module_id: String,
    #[serde(default)]
    pub module_name: String,
    #[serde(default)]
    pub project: ProjectMetadata,
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub template_validations: Vec<TemplateValidation>,
}

impl ScenarioSuite {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        parse_by_extension(path, &content)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScenarioConfig {
    One(ModuleConfig),
    Many(Vec<ModuleConfig>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Module ids that must end up in the activation set
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub config: ScenarioConfig,
    #[serde(default)]
    pub expected_files: Vec<String>,
    #[serde(default)]
    pub file_content_checks: Vec<FileContentCheck>,
}

impl Scenario {
    pub fn modules(&self) -> &[ModuleConfig] {
        match &self.config {
            ScenarioConfig::One(config) => std::slice::from_ref(config),
            ScenarioConfig::Many(configs) => configs,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContentCheck {
    pub file: String,
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub not_contains: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateValidation {
    pub name: String,
    /// `<type>/<provider>/<source path>`
    pub template: String,
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub not_contains: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum Failure {
    #[error("[{scenario}] generation failed: {source}")]
    Generation {
        scenario: String,
        #[source]
        source: Error,
    },

    #[error("[{scenario}] module '{module_id}' was not activated.")]
    MissingDependency { scenario: String, module_id: String },

    #[error("[{scenario}] expected file '{path}' was not generated.")]
    MissingFile { scenario: String, path: String },

    #[error("[{scenario}] '{path}' does not contain '{needle}'.")]
    MissingContent { scenario: String, path: String, needle: String },

    #[error("[{scenario}] '{path}' must not contain '{needle}'.")]
    ForbiddenContent { scenario: String, path: String, needle: String },

    #[error("[{validation}] template '{template}' does not exist.")]
    UnknownTemplate { validation: String, template: String },

    #[error("[{validation}] template '{template}' does not contain '{needle}' ({reason}).")]
    TemplateMissingContent {
        validation: String,
        template: String,
        needle: String,
        reason: String,
    },

    #[error("[{validation}] template '{template}' must not contain '{needle}' ({reason}).")]
    TemplateForbiddenContent {
        validation: String,
        template: String,
        needle: String,
        reason: String,
    },
}

/// Every failed check of a verification, not just the first.
#[derive(Debug, Default)]
pub struct Report {
    pub checks: usize,
    pub failures: Vec<Failure>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn check(&mut self, passed: bool, failure: impl FnOnce() -> Failure) {
        self.checks += 1;
        if !passed {
            self.failures.push(failure());
        }
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(Error::VerificationFailed { failures: self.failures.len() })
        }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for failure in &self.failures {
            writeln!(f, "FAIL {failure}")?;
        }
        write!(f, "{} check(s), {} failure(s)", self.checks, self.failures.len())
    }
}

/// Checks `files` against expected paths and content checks, appending to `report`.
pub fn verify_files(
    scenario: &str,
    files: &FileSet,
    expected_files: &[String],
    checks: &[FileContentCheck],
    report: &mut Report,
) {
    for path in expected_files {
        report.check(files.contains(path), || Failure::MissingFile {
            scenario: scenario.to_string(),
            path: path.clone(),
        });
    }

    for check in checks {
        let Some(content) = files.content(&check.file) else {
            report.check(false, || Failure::MissingFile {
                scenario: scenario.to_string(),
                path: check.file.clone(),
            });
            continue;
        };
        for needle in &check.contains {
            report.check(content.contains(needle.as_str()), || Failure::MissingContent {
                scenario: scenario.to_string(),
                path: check.file.clone(),
                needle: needle.clone(),
            });
        }
        for needle in &check.not_contains {
            report.check(!content.contains(needle.as_str()), || Failure::ForbiddenContent {
                scenario: scenario.to_string(),
                path: check.file.clone(),
                needle: needle.clone(),
            });
        }
    }
}

/// Runs scenario suites through a generator and checks the results.
pub struct Verifier<'a> {
    generator: Generator<'a>,
    store: &'a dyn TemplateStore,
}

impl<'a> Verifier<'a> {
    pub fn new(generator: Generator<'a>, store: &'a dyn TemplateStore) -> Self {
        Self { generator, store }
    }

    pub fn verify_suite(&self, suite: &ScenarioSuite) -> Report {
        let mut report = Report::default();
        for scenario in &suite.scenarios {
            log::info!("Verifying scenario '{}'", scenario.name);
            self.verify_scenario(&suite.project, scenario, &mut report);
        }
        for validation in &suite.template_validations {
            self.verify_template(validation, &mut report);
        }
        report
    }

    pub fn verify_scenario(
        &self,
        project: &ProjectMetadata,
        scenario: &Scenario,
        report: &mut Report,
    ) {
        let generation = match self.generator.generate(project, scenario.modules()) {
            Ok(generation) => generation,
            Err(source) => {
                report.check(false, || Failure::Generation {
                    scenario: scenario.name.clone(),
                    source,
                });
                return;
            }
        };

        for module_id in &scenario.dependencies {
            let activated = generation.activated.iter().any(|id| id == module_id);
            report.check(activated, || Failure::MissingDependency {
                scenario: scenario.name.clone(),
                module_id: module_id.clone(),
            });
        }
        verify_files(
            &scenario.name,
            &generation.files,
            &scenario.expected_files,
            &scenario.file_content_checks,
            report,
        );
    }

    pub fn verify_template(&self, validation: &TemplateValidation, report: &mut Report) {
        let source = TemplateKey::parse(&validation.template).and_then(|key| self.store.get(&key));
        let Some(source) = source else {
            report.check(false, || Failure::UnknownTemplate {
                validation: validation.name.clone(),
                template: validation.template.clone(),
            });
            return;
        };

        for needle in &validation.contains {
            report.check(source.contains(needle.as_str()), || Failure::TemplateMissingContent {
                validation: validation.name.clone(),
                template: validation.template.clone(),
                needle: needle.clone(),
                reason: validation.reason.clone(),
            });
        }
        for needle in &validation.not_contains {
            report.check(!source.contains(needle.as_str()), || {
                Failure::TemplateForbiddenContent {
                    validation: validation.name.clone(),
                    template: validation.template.clone(),
                    needle: needle.clone(),
                    reason: validation.reason.clone(),
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::GeneratedFile;

    fn files() -> FileSet {
        let mut files = FileSet::new();
        files.insert(GeneratedFile {
            path: "frontend/.env".to_string(),
            content: "VITE_STYTCH_PUBLIC_TOKEN=abc\n".to_string(),
            module_id: "stytch".to_string(),
            provider: "react".to_string(),
            template: "stytch/react/.env".to_string(),
        });
        files
    }

    #[test]
    fn collects_every_failure() {
        let checks = [
            FileContentCheck {
                file: "frontend/.env".to_string(),
                contains: vec!["VITE_STYTCH_PUBLIC_TOKEN".to_string(), "VITE_API".to_string()],
                not_contains: vec!["abc".to_string()],
            },
            FileContentCheck { file: "frontend/missing.ts".to_string(), ..Default::default() },
        ];
        let expected = ["frontend/.env".to_string(), "frontend/index.html".to_string()];

        let mut report = Report::default();
        verify_files("react", &files(), &expected, &checks, &mut report);

        assert_eq!(report.checks, 6);
        assert_eq!(report.failures.len(), 4);
        assert!(matches!(&report.failures[0], Failure::MissingFile { path, .. } if path == "frontend/index.html"));
        assert!(matches!(&report.failures[1], Failure::MissingContent { needle, .. } if needle == "VITE_API"));
        assert!(matches!(&report.failures[2], Failure::ForbiddenContent { .. }));
        assert!(matches!(&report.failures[3], Failure::MissingFile { .. }));
        assert!(matches!(report.into_result(), Err(Error::VerificationFailed { failures: 4 })));
    }

    #[test]
    fn passing_checks_produce_a_clean_report() {
        let checks = [FileContentCheck {
            file: "frontend/.env".to_string(),
            contains: vec!["VITE_STYTCH_PUBLIC_TOKEN".to_string()],
            not_contains: vec!["STYTCH_SECRET".to_string()],
        }];
        let mut report = Report::default();
        verify_files("react", &files(), &["frontend/.env".to_string()], &checks, &mut report);

        assert!(report.is_success());
        assert_eq!(report.to_string(), "3 check(s), 0 failure(s)");
    }

    #[test]
    fn parses_single_and_multiple_configs() {
        let yaml = r#"
moduleId: extension-stytch
scenarios:
  - name: one
    config: { moduleId: s, kind: extension, type: stytch, providers: [react] }
  - name: many
    config:
      - { moduleId: a, kind: extension, type: stytch }
      - { moduleId: b, kind: extension, type: rbac, enabled: false }
    fileContentChecks:
      - { file: x, notContains: [y] }
templateValidations:
  - { name: v, template: stytch/react/.env, contains: [VITE] }
"#;
        let suite: ScenarioSuite = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(suite.scenarios[0].modules().len(), 1);
        assert_eq!(suite.scenarios[1].modules()[1].module_id, "b");
        assert!(!suite.scenarios[1].modules()[1].enabled);
        assert_eq!(suite.scenarios[1].file_content_checks[0].not_contains, ["y"]);
        assert_eq!(suite.template_validations[0].contains, ["VITE"]);
        assert_eq!(suite.project.name, "app");
    }
}
