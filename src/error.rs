use std::fmt::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}.")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML. Original error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON. Original error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template syntax error in '{template}'. Original error: {source}")]
    Template {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("No configuration file found in '{dir}'. Tried: {config_files}.")]
    ConfigNotFound { dir: String, config_files: String },

    #[error("Invalid module descriptor '{path}': {reason}.")]
    InvalidDescriptor { path: String, reason: String },

    #[error("Module id '{module_id}' is configured more than once.")]
    DuplicateModuleId { module_id: String },

    #[error("Module '{module_id}' sets field '{field}', which module type '{module_type}' does not declare.")]
    UnknownField { module_id: String, module_type: String, field: String },

    #[error("Module '{module_id}' field '{field}' expects a {expected} value.")]
    FieldTypeMismatch { module_id: String, field: String, expected: String },

    #[error("Module '{module_id}' selects provider '{provider}', which module type '{module_type}' does not support.")]
    UnsupportedProvider { module_id: String, module_type: String, provider: String },

    #[error("Template '{module_type}/{provider}/{source_path}' does not exist in the template store.")]
    TemplateNotFound { module_type: String, provider: String, source_path: String },

    #[error("Module '{module_id}' has unknown module type '{module_type}'.")]
    UnknownModuleType { module_id: String, module_type: String },

    #[error("Module '{module_id}' depends on '{dependency}', but {reason}.")]
    MissingDependencyConfig { module_id: String, dependency: String, reason: String },

    #[error("Cyclic module dependency: {}.", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Module '{module_id}' is missing required field '{field}'.")]
    MissingRequiredField { module_id: String, field: String },

    #[error("Context key '{key}' set by module '{module_id}' was already set by '{owner}'.")]
    ContextKeyCollision { key: String, owner: String, module_id: String },

    #[error("Template '{template}' references undefined context variable(s): {}.", variables.join(", "))]
    UndefinedTemplateVariable { template: String, variables: Vec<String> },

    #[error("Output path pattern '{pattern}' of template '{template}' did not resolve: {reason}.")]
    UnresolvedPathVariable { template: String, pattern: String, reason: String },

    #[error("Output path '{path}' is claimed exclusively by both '{first}' and '{second}'.")]
    OutputPathConflict { path: String, first: String, second: String },

    #[error("Client-facing file '{path}' exposes secret field '{field}'.")]
    SecretLeak { path: String, field: String },

    #[error("Cannot proceed: output directory '{output_dir}' already exists. Use --force to overwrite it.")]
    OutputDirectoryExists { output_dir: String },

    #[error("Verification failed with {failures} failed check(s).")]
    VerificationFailed { failures: usize },
}

/// Flat classification of [`Error`], used to record why a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    Parse,
    Template,
    ConfigNotFound,
    InvalidDescriptor,
    InvalidConfig,
    TemplateNotFound,
    UnknownModuleType,
    MissingDependencyConfig,
    CyclicDependency,
    MissingRequiredField,
    ContextKeyCollision,
    UndefinedTemplateVariable,
    UnresolvedPathVariable,
    OutputPathConflict,
    SecretLeak,
    OutputDirectoryExists,
    VerificationFailed,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Yaml(_) | Error::Json(_) => ErrorKind::Parse,
            Error::Template { .. } => ErrorKind::Template,
            Error::ConfigNotFound { .. } => ErrorKind::ConfigNotFound,
            Error::InvalidDescriptor { .. } => ErrorKind::InvalidDescriptor,
            Error::DuplicateModuleId { .. }
            | Error::UnknownField { .. }
            | Error::FieldTypeMismatch { .. }
            | Error::UnsupportedProvider { .. } => ErrorKind::InvalidConfig,
            Error::TemplateNotFound { .. } => ErrorKind::TemplateNotFound,
            Error::UnknownModuleType { .. } => ErrorKind::UnknownModuleType,
            Error::MissingDependencyConfig { .. } => ErrorKind::MissingDependencyConfig,
            Error::CyclicDependency { .. } => ErrorKind::CyclicDependency,
            Error::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            Error::ContextKeyCollision { .. } => ErrorKind::ContextKeyCollision,
            Error::UndefinedTemplateVariable { .. } => {
                ErrorKind::UndefinedTemplateVariable
            }
            Error::UnresolvedPathVariable { .. } => ErrorKind::UnresolvedPathVariable,
            Error::OutputPathConflict { .. } => ErrorKind::OutputPathConflict,
            Error::SecretLeak { .. } => ErrorKind::SecretLeak,
            Error::OutputDirectoryExists { .. } => ErrorKind::OutputDirectoryExists,
            Error::VerificationFailed { .. } => ErrorKind::VerificationFailed,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The error to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(crate::constants::exit_codes::FAILURE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_every_hop() {
        let err = Error::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cyclic module dependency: a -> b -> a.");
        assert_eq!(err.kind(), ErrorKind::CyclicDependency);
    }

    #[test]
    fn config_validation_errors_share_a_kind() {
        let err = Error::UnknownField {
            module_id: "stytch-spring".into(),
            module_type: "stytch".into(),
            field: "colour".into(),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert!(err.to_string().contains("'colour'"));
    }
}
