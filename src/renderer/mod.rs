//! Template rendering
//!
//! - `interface`: the [`TemplateRenderer`] trait the assembler renders through
//! - `minijinja`: the MiniJinja-backed implementation
//! - `filters`: custom filters registered in the environment

pub mod filters;
pub mod interface;
pub mod minijinja;

pub use interface::TemplateRenderer;
pub use self::minijinja::MiniJinjaRenderer;
