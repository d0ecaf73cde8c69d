//! Parse and validate `.RULE` files.
//!
//! A rule is a text file named `<identifier>.RULE` with its YAML metadata
//! either in a sibling `<identifier>.yml` file or in a frontmatter block at the
//! top of the text:
//!
//! ```text
//! ---
//! license_expression: mit
//! is_license_notice: yes
//! ---
//! Licensed under the MIT License.
//! ```
//!
//! Any invalid rule file is an error naming the file: a corpus with a broken
//! rule is never indexed partially.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, warn};
use serde::{Deserialize, Deserializer, de};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::license_detection::expression::parse_expression;
use crate::license_detection::models::{NOT_A_LICENSE, Rule};
use crate::license_detection::tokenize::rule_tokenizer;

const RULE_EXTENSION: &str = "RULE";
const METADATA_EXTENSION: &str = "yml";
const FRONTMATTER_DELIMITER: &str = "---";

fn deserialize_yes_no_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum YesNoOrBool {
        String(String),
        Bool(bool),
    }

    match Option::<YesNoOrBool>::deserialize(deserializer)? {
        None => Ok(None),
        Some(YesNoOrBool::Bool(b)) => Ok(Some(b)),
        Some(YesNoOrBool::String(s)) => match s.to_lowercase().as_str() {
            "yes" | "true" | "1" => Ok(Some(true)),
            "no" | "false" | "0" => Ok(Some(false)),
            other => Err(de::Error::custom(format!(
                "expected yes/no or a boolean, got '{}'",
                other
            ))),
        },
    }
}

trait ParsePercentage {
    /// Read a 0-100 value; `None` if negative, above 100 or not a number.
    fn as_percentage(&self) -> Option<u8>;
}

impl ParsePercentage for serde_yaml::Number {
    fn as_percentage(&self) -> Option<u8> {
        if let Some(n) = self.as_i64() {
            return (0..=100).contains(&n).then_some(n as u8);
        }
        self.as_f64()
            .filter(|f| (0.0..=100.0).contains(f))
            .map(|f| f as u8)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RuleMetadata {
    #[serde(default)]
    license_expression: Option<String>,

    #[serde(default, deserialize_with = "deserialize_yes_no_bool")]
    is_license_text: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_yes_no_bool")]
    is_license_notice: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_yes_no_bool")]
    is_license_reference: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_yes_no_bool")]
    is_license_tag: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_yes_no_bool")]
    is_false_positive: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_yes_no_bool")]
    is_negative: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_yes_no_bool")]
    is_continuous: Option<bool>,

    #[serde(default)]
    relevance: Option<serde_yaml::Number>,

    #[serde(default)]
    minimum_coverage: Option<serde_yaml::Number>,

    #[serde(default)]
    notes: Option<String>,
}

/// Parse one `.RULE` file, reading its metadata from the frontmatter or from
/// the sibling `.yml` file.
pub fn parse_rule_file(path: &Path) -> Result<Rule> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule file: {}", path.display()))?;

    let identifier = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Invalid rule file name: {}", path.display()))?
        .to_string();

    let (metadata, text) = match split_frontmatter(&content) {
        Some((metadata, text)) => (metadata.to_string(), text),
        None => {
            let metadata_path = path.with_extension(METADATA_EXTENSION);
            let metadata = fs::read_to_string(&metadata_path).with_context(|| {
                format!(
                    "Rule file has no frontmatter and no metadata file {}",
                    metadata_path.display()
                )
            })?;
            (metadata, content.as_str())
        }
    };

    parse_rule(&identifier, &metadata, text)
        .with_context(|| format!("Invalid rule file: {}", path.display()))
}

/// Split `---`-delimited frontmatter from the rule text.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.trim_start().strip_prefix(FRONTMATTER_DELIMITER)?;
    let end = rest.find(&format!("\n{}", FRONTMATTER_DELIMITER))?;
    let metadata = &rest[..end];
    let text = &rest[end + 1 + FRONTMATTER_DELIMITER.len()..];
    Some((metadata, text))
}

/// Build and validate a rule from its YAML metadata and text.
pub fn parse_rule(identifier: &str, metadata: &str, text: &str) -> Result<Rule> {
    let metadata: RuleMetadata = if metadata.trim().is_empty() {
        RuleMetadata::default()
    } else {
        serde_yaml::from_str(metadata).context("Failed to parse rule metadata YAML")?
    };

    let text = text.trim();
    let is_negative = metadata.is_negative.unwrap_or(false);
    let is_false_positive = metadata.is_false_positive.unwrap_or(false);

    let license_expression = match metadata.license_expression {
        Some(expr) if !expr.trim().is_empty() => expr.trim().to_string(),
        _ if is_negative || is_false_positive => NOT_A_LICENSE.to_string(),
        _ => bail!("Missing required field 'license_expression'"),
    };

    let relevance = match metadata.relevance {
        Some(num) => num
            .as_percentage()
            .ok_or_else(|| anyhow!("Relevance must be within 0-100, got {}", num))?,
        None => 100,
    };

    let minimum_coverage = match metadata.minimum_coverage {
        Some(num) => Some(
            num.as_percentage()
                .ok_or_else(|| anyhow!("Minimum coverage must be within 0-100, got {}", num))?,
        ),
        None => None,
    };

    let mut rule = Rule::new(identifier, license_expression, text);
    rule.is_license_text = metadata.is_license_text.unwrap_or(false);
    rule.is_license_notice = metadata.is_license_notice.unwrap_or(false);
    rule.is_license_reference = metadata.is_license_reference.unwrap_or(false);
    rule.is_license_tag = metadata.is_license_tag.unwrap_or(false);
    rule.is_false_positive = is_false_positive;
    rule.is_negative = is_negative;
    rule.is_continuous = metadata.is_continuous.unwrap_or(false);
    rule.relevance = relevance;
    rule.minimum_coverage = minimum_coverage;
    rule.notes = metadata.notes.filter(|s| !s.trim().is_empty());

    validate_rule(&rule)?;
    Ok(rule)
}

/// Check a rule for consistency before it is indexed.
pub fn validate_rule(rule: &Rule) -> Result<()> {
    if rule.relevance > 100 {
        bail!("Relevance must be within 0-100, got {}", rule.relevance);
    }
    if let Some(coverage) = rule.minimum_coverage
        && coverage > 100
    {
        bail!("Minimum coverage must be within 0-100, got {}", coverage);
    }
    if rule.is_negative && rule.is_false_positive {
        bail!("A rule cannot be both negative and false positive");
    }

    let flags = rule.kind_flag_count();
    if rule.is_real_license() {
        if flags != 1 {
            bail!(
                "Exactly one of is_license_text, is_license_notice, is_license_reference \
                 or is_license_tag must be set, found {}",
                flags
            );
        }
        parse_expression(&rule.license_expression).map_err(|e| {
            anyhow!(
                "Invalid license_expression '{}': {}",
                rule.license_expression,
                e
            )
        })?;
    } else if flags > 1 {
        bail!("At most one is_license_* flag may be set, found {}", flags);
    }

    if !rule_tokenizer(&rule.text).iter().any(Option::is_some) {
        bail!("Rule text has no tokens");
    }
    Ok(())
}

/// Load and validate every `.RULE` file of a directory, sorted by file name.
pub fn load_rules_from_directory(dir: &Path) -> Result<Vec<Rule>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read rules directory: {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read directory entry in: {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some(RULE_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    let rules = paths
        .iter()
        .map(|path| parse_rule_file(path))
        .collect::<Result<Vec<_>>>()?;

    validate_rules(&rules)?;
    debug!("Loaded {} rules from {}", rules.len(), dir.display());
    Ok(rules)
}

/// Corpus-wide checks: identifiers are unique; duplicate texts are reported.
pub fn validate_rules(rules: &[Rule]) -> Result<()> {
    let mut seen_identifiers: HashSet<&str> = HashSet::new();
    let mut seen_texts: HashSet<&str> = HashSet::new();
    let mut duplicate_texts = 0;

    for rule in rules {
        if !seen_identifiers.insert(&rule.identifier) {
            bail!("Duplicate rule identifier: {}", rule.identifier);
        }
        if !seen_texts.insert(&rule.text) {
            warn!(
                "Duplicate rule text in {} for license_expression: {}",
                rule.identifier, rule.license_expression
            );
            duplicate_texts += 1;
        }
    }

    if duplicate_texts > 0 {
        warn!(
            "Found {} duplicate rule text(s) during rule validation",
            duplicate_texts
        );
    }
    Ok(())
}
