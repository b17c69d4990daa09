//! Constants used throughout Genesis

/// Project configuration file names in order of preference
pub const CONFIG_FILENAMES: &[&str] = &["genesis.json", "genesis.yaml", "genesis.yml"];

/// Module descriptor file name inside each registry module directory
pub const DESCRIPTOR_FILENAME: &str = "module.yaml";

/// Provider catalog file name at the registry root
pub const PROVIDERS_FILENAME: &str = "providers.yaml";

/// Directory holding a module's templates, one sub-directory per provider
pub const TEMPLATES_DIR: &str = "templates";

/// Template file suffix, stripped from the logical source path
pub const TEMPLATE_SUFFIX: &str = ".j2";

/// Registry directory used when none is given on the command line
pub const DEFAULT_REGISTRY_DIR: &str = "modules";

/// Logical output path separator, independent of the host
pub const PATH_SEPARATOR: char = '/';

/// Ambient context keys derived from project metadata
pub mod ambient {
    pub const PROJECT_NAME: &str = "projectName";
    pub const BASE_PACKAGE: &str = "basePackage";
    pub const PACKAGE_PATH: &str = "packagePath";
}

/// Owner names recorded in the rendering context for non-module keys
pub mod owners {
    pub const AMBIENT: &str = "<ambient>";
    pub const DERIVED: &str = "<derived>";
}

/// Exit codes
pub mod exit_codes {
    pub const FAILURE: i32 = 1;
}

/// Verbosity levels
pub mod verbosity {
    pub const OFF: u8 = 0;
    pub const INFO: u8 = 1;
    pub const DEBUG: u8 = 2;
    pub const TRACE: u8 = 3;
}
