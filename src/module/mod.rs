//! Module descriptors and the registry they are looked up in
//!
//! - `descriptor`: field schema, dependencies and templates of one module type
//! - `registry`: descriptor lookup by type and the provider catalog

pub mod descriptor;
pub mod registry;

pub use descriptor::{
    Dependency, FieldSpec, FieldType, Instantiation, ModuleDescriptor, SecretSpec,
    TemplateRef,
};
pub use registry::{Registry, Stack};
