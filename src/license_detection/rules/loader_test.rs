//! Tests for rule file parsing and validation.

use super::loader::*;
use crate::license_detection::models::{NOT_A_LICENSE, Rule};
use anyhow::Result;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn parse_rule_from_str(content: &str, filename: &str) -> Result<Rule> {
    let dir = tempdir()?;
    let path = dir.path().join(filename);
    fs::write(&path, content)?;
    parse_rule_file(&path)
}

#[test]
fn test_parse_rule_file_with_frontmatter() {
    let content = r#"---
license_expression: mit
is_license_text: yes
relevance: 90
---
Permission is hereby granted, free of charge."#;

    let rule = parse_rule_from_str(content, "mit_1.RULE").unwrap();
    assert_eq!(rule.identifier, "mit_1.RULE");
    assert_eq!(rule.license_expression, "mit");
    assert_eq!(rule.text, "Permission is hereby granted, free of charge.");
    assert!(rule.is_license_text);
    assert_eq!(rule.relevance, 90);
}

#[test]
fn test_parse_rule_file_with_sibling_metadata() {
    let dir = tempdir().unwrap();
    write(dir.path(), "apache_2.RULE", "Licensed under the Apache License, Version 2.0");
    write(
        dir.path(),
        "apache_2.yml",
        "license_expression: apache-2.0\nis_license_notice: true\nminimum_coverage: 80\n",
    );

    let rule = parse_rule_file(&dir.path().join("apache_2.RULE")).unwrap();
    assert_eq!(rule.license_expression, "apache-2.0");
    assert!(rule.is_license_notice);
    assert_eq!(rule.minimum_coverage, Some(80));
    assert_eq!(rule.relevance, 100);
}

#[test]
fn test_missing_metadata_is_an_error() {
    let dir = tempdir().unwrap();
    write(dir.path(), "orphan.RULE", "Some license text");
    let err = parse_rule_file(&dir.path().join("orphan.RULE")).unwrap_err();
    assert!(format!("{:#}", err).contains("orphan.yml"));
}

#[test]
fn test_missing_expression_is_an_error() {
    let content = "---\nis_license_notice: yes\n---\nsome license";
    let err = parse_rule_from_str(content, "bad.RULE").unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("bad.RULE"), "{}", message);
    assert!(message.contains("license_expression"), "{}", message);
}

#[test]
fn test_negative_rule_gets_sentinel_expression() {
    let content = "---\nis_negative: yes\n---\nthis is not a license";
    let rule = parse_rule_from_str(content, "not_license.RULE").unwrap();
    assert!(rule.is_negative);
    assert!(!rule.is_real_license());
    assert_eq!(rule.license_expression, NOT_A_LICENSE);
}

#[test]
fn test_no_kind_flag_is_an_error() {
    let content = "---\nlicense_expression: mit\n---\nMIT";
    assert!(parse_rule_from_str(content, "mit.RULE").is_err());
}

#[test]
fn test_two_kind_flags_is_an_error() {
    let content = "---\nlicense_expression: mit\nis_license_text: yes\nis_license_tag: yes\n---\nMIT";
    let err = parse_rule_from_str(content, "mit.RULE").unwrap_err();
    assert!(format!("{:#}", err).contains("Exactly one"));
}

#[test]
fn test_relevance_out_of_range_is_an_error() {
    let content = "---\nlicense_expression: mit\nis_license_tag: yes\nrelevance: 150\n---\nMIT";
    let err = parse_rule_from_str(content, "mit.RULE").unwrap_err();
    assert!(format!("{:#}", err).contains("Relevance"));
}

#[test]
fn test_coverage_out_of_range_is_an_error() {
    let content = "---\nlicense_expression: mit\nis_license_tag: yes\nminimum_coverage: -5\n---\nMIT";
    assert!(parse_rule_from_str(content, "mit.RULE").is_err());
}

#[test]
fn test_invalid_expression_is_an_error() {
    let content = "---\nlicense_expression: (mit OR\nis_license_tag: yes\n---\nMIT";
    let err = parse_rule_from_str(content, "mit.RULE").unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid license_expression"));
}

#[test]
fn test_duplicate_key_is_an_error() {
    let content = "---\nlicense_expression: mit\nis_license_tag: yes\nis_license_tag: no\n---\nMIT";
    assert!(parse_rule_from_str(content, "mit.RULE").is_err());
}

#[test]
fn test_invalid_boolean_is_an_error() {
    let content = "---\nlicense_expression: mit\nis_license_tag: maybe\n---\nMIT";
    assert!(parse_rule_from_str(content, "mit.RULE").is_err());
}

#[test]
fn test_text_without_tokens_is_an_error() {
    let content = "---\nlicense_expression: mit\nis_license_tag: yes\n---\n{{anything}} ...";
    let err = parse_rule_from_str(content, "mit.RULE").unwrap_err();
    assert!(format!("{:#}", err).contains("no tokens"));
}

#[test]
fn test_template_text_is_kept_verbatim() {
    let content = "---\nlicense_expression: bsd-new\nis_license_notice: yes\n---\nCopyright {{holder}} All rights reserved";
    let rule = parse_rule_from_str(content, "bsd.RULE").unwrap();
    assert!(rule.text.contains("{{holder}}"));
}

#[test]
fn test_load_rules_from_directory_sorted() {
    let dir = tempdir().unwrap();
    write(dir.path(), "b.RULE", "---\nlicense_expression: mit\nis_license_tag: yes\n---\nMIT");
    write(
        dir.path(),
        "a.RULE",
        "---\nlicense_expression: apache-2.0\nis_license_tag: yes\n---\nApache-2.0",
    );
    write(dir.path(), "README.txt", "not a rule");

    let rules = load_rules_from_directory(dir.path()).unwrap();
    let ids: Vec<_> = rules.iter().map(|r| r.identifier.as_str()).collect();
    assert_eq!(ids, vec!["a.RULE", "b.RULE"]);
}

#[test]
fn test_load_rules_from_directory_fails_on_bad_rule() {
    let dir = tempdir().unwrap();
    write(dir.path(), "good.RULE", "---\nlicense_expression: mit\nis_license_tag: yes\n---\nMIT");
    write(dir.path(), "broken.RULE", "---\nis_license_tag: yes\n---\nMIT");

    let err = load_rules_from_directory(dir.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("broken.RULE"));
}

#[test]
fn test_load_rules_from_missing_directory() {
    let dir = tempdir().unwrap();
    assert!(load_rules_from_directory(&dir.path().join("nope")).is_err());
}

#[test]
fn test_validate_rules_rejects_duplicate_identifiers() {
    let mut rule = Rule::new("same.RULE", "mit", "MIT");
    rule.is_license_tag = true;
    let rules = vec![rule.clone(), rule];
    assert!(validate_rules(&rules).is_err());
}

#[test]
fn test_validate_rules_allows_duplicate_texts() {
    let mut a = Rule::new("a.RULE", "mit", "MIT");
    a.is_license_tag = true;
    let mut b = Rule::new("b.RULE", "mit", "MIT");
    b.is_license_tag = true;
    assert!(validate_rules(&[a, b]).is_ok());
}
