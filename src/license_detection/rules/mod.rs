//! Rule loading, validation and per-rule thresholds.

pub mod legalese;
pub mod loader;
pub mod thresholds;

#[cfg(test)]
mod loader_test;

pub use loader::{load_rules_from_directory, parse_rule, parse_rule_file, validate_rule, validate_rules};
