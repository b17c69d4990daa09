use log::warn;
use regex::Regex;

// Case conversions for identifiers derived from project and field values
pub use cruet::case::{
    camel::to_camel_case, kebab::to_kebab_case, pascal::to_pascal_case,
    screaming_snake::to_screaming_snake_case, snake::to_snake_case, train::to_train_case,
};

/// Custom regex filter for template processing.
///
/// Tests if a string matches a given regular expression pattern.
///
/// # Arguments
/// * `val` - The string to test
/// * `re` - The regular expression pattern
///
/// # Returns
/// * `bool` - True if the string matches the pattern, false otherwise
pub fn regex_filter(val: &str, re: &str) -> bool {
    match Regex::new(re) {
        Ok(re) => re.is_match(val),
        Err(err) => {
            warn!("Invalid regex '{re}': {err}");
            false
        }
    }
}

/// Turns a dotted package name into a path, e.g. `com.example.app` -> `com/example/app`.
pub fn package_path_filter(val: &str) -> String {
    val.split('.').filter(|segment| !segment.is_empty()).collect::<Vec<_>>().join("/")
}
