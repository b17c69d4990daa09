use crate::context::RenderingContext;
use crate::error::Result;

/// Trait for template rendering engines.
///
/// Renderers are shared by the parallel render workers, so they must be `Sync`.
pub trait TemplateRenderer: Send + Sync {
    /// Renders template text with the given context.
    ///
    /// # Arguments
    /// * `template` - Template text to render
    /// * `context` - Merged rendering context of the run
    /// * `template_name` - Name used in error messages
    ///
    /// # Returns
    /// * `Result<String>` - Rendered text, or `UndefinedTemplateVariable` when the
    ///   template reads a key the context does not define
    fn render(
        &self,
        template: &str,
        context: &RenderingContext,
        template_name: &str,
    ) -> Result<String>;

    /// Renders an output path pattern into a logical, forward-slash path.
    ///
    /// # Returns
    /// * `Result<String>` - The resolved path, or `UnresolvedPathVariable` when a
    ///   placeholder cannot be resolved or leaves an invalid path behind
    fn render_path(
        &self,
        pattern: &str,
        context: &RenderingContext,
        template_name: &str,
    ) -> Result<String>;

    /// Evaluates an expression and returns whether it is true.
    ///
    /// An empty expression is always true.
    fn execute_expression(&self, expr: &str, context: &serde_json::Value) -> Result<bool>;
}
