//! Shared test utilities for license detection tests.

use crate::license_detection::index::{LicenseIndex, build_index};
use crate::license_detection::models::{NOT_A_LICENSE, Rule};
use crate::license_detection::query::{Query, QueryOptions};

/// Creates a license notice rule with default relevance.
pub fn create_rule(identifier: &str, license_expression: &str, text: &str) -> Rule {
    let mut rule = Rule::new(identifier, license_expression, text);
    rule.is_license_notice = true;
    rule
}

/// Creates a negative rule: text that must never be reported as a license.
pub fn create_negative_rule(identifier: &str, text: &str) -> Rule {
    let mut rule = Rule::new(identifier, NOT_A_LICENSE, text);
    rule.is_negative = true;
    rule
}

/// Builds an index over the given rules.
pub fn index_of(rules: Vec<Rule>) -> LicenseIndex {
    build_index(rules).expect("test rules should index")
}

/// Tokenizes `text` into a query with default options.
pub fn query_of(index: &LicenseIndex, text: &str) -> Query {
    Query::from_text(index, text, &QueryOptions::default())
}

/// A BSD style notice long enough to be approximately matched.
pub const BSD_NOTICE: &str = "Redistribution and use in source and binary forms, with or \
    without modification, are permitted provided that the following conditions are met: \
    Redistributions of source code must retain the above copyright notice, this list of \
    conditions and the following disclaimer.";
