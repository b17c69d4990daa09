use super::filters::*;
use crate::constants::PATH_SEPARATOR;
use crate::context::RenderingContext;
use crate::error::{Error, Result};
use crate::renderer::interface::TemplateRenderer;
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};

/// Names minijinja resolves without the context.
const BUILTIN_NAMES: &[&str] = &["range", "dict", "namespace", "debug", "loop", "self", "super"];

/// Why a render did not produce text.
enum RenderFailure {
    /// The template read keys the context does not define
    Undefined(Vec<String>),
    Other(minijinja::Error),
}

/// MiniJinja-based template rendering engine.
///
/// Undefined variables are errors, output is never HTML-escaped and trailing
/// newlines are kept, so generated source files come out byte-for-byte as written.
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Creates a new MiniJinjaRenderer instance with the Genesis environment.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        env.add_filter("camel_case", to_camel_case);
        env.add_filter("kebab_case", to_kebab_case);
        env.add_filter("pascal_case", to_pascal_case);
        env.add_filter("screaming_snake_case", to_screaming_snake_case);
        env.add_filter("snake_case", to_snake_case);
        env.add_filter("train_case", to_train_case);
        env.add_filter("regex", regex_filter);
        env.add_filter("package_path", package_path_filter);

        Self { env }
    }

    fn render_internal(
        &self,
        source: &str,
        context: &RenderingContext,
        template_name: &str,
    ) -> Result<String, RenderFailure> {
        let tmpl = self
            .env
            .template_from_named_str(template_name, source)
            .map_err(RenderFailure::Other)?;

        match tmpl.render(context.values()) {
            Ok(rendered) => Ok(rendered),
            Err(err) if err.kind() == ErrorKind::UndefinedError => {
                let mut missing: Vec<String> = tmpl
                    .undeclared_variables(false)
                    .into_iter()
                    .filter(|name| {
                        !context.contains_key(name) && !BUILTIN_NAMES.contains(&name.as_str())
                    })
                    .collect();
                missing.sort();
                if missing.is_empty() {
                    missing.push(err.to_string());
                }
                Err(RenderFailure::Undefined(missing))
            }
            Err(err) => Err(RenderFailure::Other(err)),
        }
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks a rendered output path and normalizes its separators.
///
/// A conditional segment that rendered to nothing, a leftover placeholder, or a
/// path escaping the project root are all rejected.
fn check_rendered_path(rendered: &str) -> Result<String, String> {
    let normalized = rendered.trim().replace('\\', "/");

    if normalized.is_empty() {
        return Err("the path rendered empty".to_string());
    }
    if ["{{", "}}", "{%", "%}"].iter().any(|marker| normalized.contains(marker)) {
        return Err(format!("'{normalized}' still contains a placeholder"));
    }
    if normalized.starts_with(PATH_SEPARATOR) {
        return Err(format!("'{normalized}' is absolute"));
    }
    for segment in normalized.split(PATH_SEPARATOR) {
        match segment {
            "" => return Err(format!("'{normalized}' has an empty segment")),
            "." | ".." => {
                return Err(format!("'{normalized}' contains a relative segment '{segment}'"))
            }
            _ => {}
        }
    }

    Ok(normalized)
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(
        &self,
        template: &str,
        context: &RenderingContext,
        template_name: &str,
    ) -> Result<String> {
        self.render_internal(template, context, template_name).map_err(|failure| {
            match failure {
                RenderFailure::Undefined(variables) => Error::UndefinedTemplateVariable {
                    template: template_name.to_string(),
                    variables,
                },
                RenderFailure::Other(source) => {
                    Error::Template { template: template_name.to_string(), source }
                }
            }
        })
    }

    fn render_path(
        &self,
        pattern: &str,
        context: &RenderingContext,
        template_name: &str,
    ) -> Result<String> {
        let unresolved = |reason: String| Error::UnresolvedPathVariable {
            template: template_name.to_string(),
            pattern: pattern.to_string(),
            reason,
        };

        let rendered = self.render_internal(pattern, context, template_name).map_err(
            |failure| match failure {
                RenderFailure::Undefined(variables) => {
                    unresolved(format!("undefined {}", variables.join(", ")))
                }
                RenderFailure::Other(source) => {
                    Error::Template { template: template_name.to_string(), source }
                }
            },
        )?;

        check_rendered_path(&rendered).map_err(unresolved)
    }

    fn execute_expression(&self, expr_str: &str, context: &serde_json::Value) -> Result<bool> {
        // Only compile the expression if it's not empty
        if expr_str.trim().is_empty() {
            return Ok(true);
        }
        let name = format!("expression '{expr_str}'");
        let to_error = |source: minijinja::Error| {
            if source.kind() == ErrorKind::UndefinedError {
                Error::UndefinedTemplateVariable {
                    template: name.clone(),
                    variables: vec![source.to_string()],
                }
            } else {
                Error::Template { template: name.clone(), source }
            }
        };

        let expr = self.env.compile_expression(expr_str).map_err(to_error)?;
        let value = expr.eval(context).map_err(to_error)?;
        if value.is_undefined() {
            return Err(Error::UndefinedTemplateVariable {
                template: name,
                variables: vec![expr_str.trim().to_string()],
            });
        }
        Ok(value.is_true())
    }
}
