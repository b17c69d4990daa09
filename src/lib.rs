/// Handles argument parsing and command dispatch.
pub mod cli;

/// Project configuration: module instances and ambient metadata.
pub mod config;

/// Constants shared across the crate.
pub mod constants;

/// Rendering context assembly.
pub mod context;

/// The generation run and its state machine.
pub mod engine;

/// Defines custom error types.
pub mod error;

/// Module descriptors and the registry that holds them.
pub mod module;

/// Template rendering functionality.
pub mod renderer;

/// Dependency closure and activation ordering.
pub mod resolver;

/// Template storage and file tree assembly.
pub mod template;

/// Scenario verification of generated output.
pub mod verify;

/// Writes generated files to disk.
pub mod writer;
