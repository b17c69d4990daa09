//! Template storage and file tree assembly
//!
//! - `store`: templates addressed by `(module type, provider, source path)`
//! - `file`: rendered files and the path-ordered set they form
//! - `assembler`: selects, renders and combines templates for a run

pub mod assembler;
pub mod file;
pub mod store;

pub use assembler::FileTreeAssembler;
pub use file::{FileSet, GeneratedFile};
pub use store::{MemoryTemplateStore, TemplateKey, TemplateStore};
