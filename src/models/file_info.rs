use derive_builder::Builder;
use serde::Serialize;

use crate::license_detection::expression::combine_license_expressions;
use crate::license_detection::{LicenseMatch, Matcher};

#[derive(Debug, Clone, Builder, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub base_name: String,
    pub extension: String,
    pub path: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub size: u64,
    #[builder(default)]
    pub date: Option<String>,
    #[builder(default)]
    pub sha1: Option<String>,
    #[builder(default)]
    pub is_text: bool,
    #[serde(rename = "detected_license_expression")]
    #[builder(default)]
    pub license_expression: Option<String>,
    #[builder(default)]
    pub license_matches: Vec<LicenseMatchOutput>,
    #[builder(default)]
    pub scan_errors: Vec<String>,
}

impl FileInfo {
    /// Directory entry, which carries no content fields.
    pub fn directory(name: String, path: String, date: Option<String>) -> Self {
        FileInfo {
            base_name: name.clone(),
            name,
            extension: String::new(),
            path,
            file_type: FileType::Directory,
            size: 0,
            date,
            sha1: None,
            is_text: false,
            license_expression: None,
            license_matches: Vec::new(),
            scan_errors: Vec::new(),
        }
    }
}

impl FileInfoBuilder {
    /// Set the license matches and the combined expression they detect.
    pub fn matches(&mut self, matches: Vec<LicenseMatchOutput>) -> &mut Self {
        let expression =
            combine_license_expressions(matches.iter().map(|m| m.license_expression.clone()));
        self.license_expression(expression).license_matches(matches)
    }
}

/// Serialized form of a license match.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LicenseMatchOutput {
    pub license_expression: String,
    pub rule_identifier: String,
    pub matcher: Matcher,
    pub score: f32,
    pub start_line: usize,
    pub end_line: usize,
    pub matched_length: usize,
    pub match_coverage: f32,
    pub rule_relevance: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
}

impl LicenseMatchOutput {
    /// Convert a match of `text`, keeping the matched lines if `include_text`.
    pub fn from_match(m: &LicenseMatch, text: &str, include_text: bool) -> Self {
        LicenseMatchOutput {
            license_expression: m.license_expression().to_string(),
            rule_identifier: m.rule_identifier().to_string(),
            matcher: m.matcher,
            score: m.weighted_score(),
            start_line: m.start_line,
            end_line: m.end_line,
            matched_length: m.len(),
            match_coverage: m.score,
            rule_relevance: m.rule.relevance,
            matched_text: include_text.then(|| m.matched_text(text)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
}

impl Serialize for FileType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let value = match self {
            FileType::File => "file",
            FileType::Directory => "directory",
        };
        serializer.serialize_str(value)
    }
}
