//! License Detection Engine
//!
//! This module detects licenses in text by matching it against an index of
//! license rules. Matching runs exact, chunk and fragment matchers in that
//! order over each query run, then refines the raw matches.

pub mod aho_match;
pub mod chunk_match;
pub mod expression;
pub mod hash;
pub mod index;
pub mod match_refine;
pub mod models;
pub mod query;
pub mod rules;
pub mod seq;
pub mod seq_match;
pub mod spans;
#[cfg(test)]
mod test_utils;
pub mod tokenize;

use anyhow::{Result, anyhow};
use derive_builder::Builder;
use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::license_detection::index::{LicenseIndex, build_index};
use crate::license_detection::query::{LINE_THRESHOLD, MAX_TOKEN_GAP, Query, QueryOptions};
use crate::license_detection::rules::{load_rules_from_directory, validate_rule, validate_rules};

pub use models::{LicenseMatch, Matcher, Rule};

/// Default maximum number of chunk matching candidates per query run.
pub const MAX_CANDIDATES: usize = 50;

/// Options of a match call.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct MatchOptions {
    /// Minimum relevance weighted score, 0-100, of a returned match
    pub min_score: f32,
    /// Lines without a known token that end a query run
    pub line_threshold: usize,
    /// Non-legalese tokens after which a legalese token starts a query run
    pub max_token_gap: usize,
    pub max_candidates: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            line_threshold: LINE_THRESHOLD,
            max_token_gap: MAX_TOKEN_GAP,
            max_candidates: MAX_CANDIDATES,
        }
    }
}

impl MatchOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(min_score) = self.min_score
            && !(0.0..=100.0).contains(&min_score)
        {
            return Err(format!("min_score must be within 0-100, got {}", min_score));
        }
        if self.line_threshold == Some(0) {
            return Err("line_threshold must be at least 1".to_string());
        }
        Ok(())
    }
}

impl MatchOptions {
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            line_threshold: self.line_threshold,
            max_token_gap: self.max_token_gap,
        }
    }
}

/// License detection engine owning a shared license index.
///
/// The engine is cheap to clone and safe to use from many threads at once.
#[derive(Debug, Clone)]
pub struct LicenseDetectionEngine {
    index: Arc<LicenseIndex>,
    options: MatchOptions,
}

impl LicenseDetectionEngine {
    /// Create an engine from a directory of `.RULE` files.
    pub fn new(rules_dir: &Path) -> Result<Self> {
        let rules = load_rules_from_directory(rules_dir)?;
        Self::from_rules(rules)
    }

    /// Create an engine from rules built in memory.
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self> {
        for rule in &rules {
            validate_rule(rule).map_err(|e| anyhow!("Invalid rule {}: {}", rule.identifier, e))?;
        }
        validate_rules(&rules)?;
        let index = build_index(rules)?;
        info!("License detection engine ready with {} rules", index.len());
        Ok(Self {
            index: Arc::new(index),
            options: MatchOptions::default(),
        })
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    pub fn index(&self) -> &LicenseIndex {
        &self.index
    }

    /// Detect licenses in a text.
    pub fn detect(&self, text: &str) -> Vec<LicenseMatch> {
        let query = Query::from_text(&self.index, text, &self.options.query_options());
        self.index.match_query(&query, &self.options)
    }

    /// Detect licenses in a pre-tokenized `(token, line)` stream.
    pub fn detect_tokens<I, S>(&self, tokens: I) -> Vec<LicenseMatch>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: AsRef<str>,
    {
        let query = Query::from_tokens(&self.index, tokens, &self.options.query_options());
        self.index.match_query(&query, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license_detection::test_utils::{BSD_NOTICE, create_rule};

    fn engine() -> LicenseDetectionEngine {
        LicenseDetectionEngine::from_rules(vec![
            create_rule("mit.RULE", "mit", "MIT License"),
            create_rule("bsd.RULE", "bsd-new", BSD_NOTICE),
        ])
        .unwrap()
    }

    #[test]
    fn test_detect_text() {
        let matches = engine().detect("Released under the MIT License.");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].license_expression(), "mit");
        assert_eq!(matches[0].start_line, 1);
    }

    #[test]
    fn test_detect_tokens_matches_detect() {
        let engine = engine();
        let tokens = crate::license_detection::tokenize::tokenize_lines(BSD_NOTICE);
        assert_eq!(engine.detect_tokens(tokens), engine.detect(BSD_NOTICE));
    }

    #[test]
    fn test_from_rules_rejects_invalid_rule() {
        let rule = Rule::new("bad.RULE", "mit", "MIT License");
        let err = LicenseDetectionEngine::from_rules(vec![rule]).unwrap_err();
        assert!(err.to_string().contains("bad.RULE"));
    }

    #[test]
    fn test_from_rules_rejects_duplicate_identifier() {
        let result = LicenseDetectionEngine::from_rules(vec![
            create_rule("mit.RULE", "mit", "MIT License"),
            create_rule("mit.RULE", "mit", "MIT"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_min_score_option() {
        let engine = engine().with_options(
            MatchOptionsBuilder::default()
                .min_score(99.0)
                .build()
                .unwrap(),
        );
        let text = BSD_NOTICE.replace("binary", "compiled");
        assert!(engine.detect(&text).is_empty());
        assert_eq!(engine.detect(BSD_NOTICE).len(), 1);
    }

    #[test]
    fn test_match_options_builder_validation() {
        assert!(MatchOptionsBuilder::default().min_score(101.0).build().is_err());
        assert!(MatchOptionsBuilder::default().line_threshold(0).build().is_err());
        let options = MatchOptionsBuilder::default().max_candidates(5).build().unwrap();
        assert_eq!(options.max_candidates, 5);
        assert_eq!(options.line_threshold, LINE_THRESHOLD);
    }
}
