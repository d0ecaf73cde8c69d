//! Text tokenization and normalization.
//!
//! Tokenization converts text into a sequence of lowercase word tokens that can
//! be matched against license rules. Rule texts and query texts go through the
//! same word pattern so a rule always matches its own text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

use crate::license_detection::index::vocabulary::{TokenId, Vocabulary};

/// Common words that are ignored from matching such as HTML tags, XML entities,
/// comment markers, etc.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut set = HashSet::new();

    // XML character references as &quot;
    set.extend(["amp", "apos", "gt", "lt", "nbsp", "quot"]);

    // html tags as <a href=https://link ...> dfsdfsdf</a>
    set.extend([
        "a",
        "abbr",
        "alt",
        "blockquote",
        "body",
        "br",
        "class",
        "div",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "hr",
        "href",
        "img",
        "li",
        "ol",
        "p",
        "pre",
        "rel",
        "script",
        "span",
        "src",
        "td",
        "th",
        "tr",
        "ul",
    ]);

    // comment line markers: batch files and autotools
    set.extend(["rem", "dnl"]);

    // doc book tags as <para>
    set.extend(["para", "ulink"]);

    // HTML punctuations and entities all as &emdash;
    set.extend([
        "bdquo", "bull", "bullet", "colon", "comma", "emdash", "emsp", "ensp", "ge", "hairsp",
        "ldquo", "ldquor", "le", "lpar", "lsaquo", "lsquo", "lsquor", "mdash", "ndash", "numsp",
        "period", "puncsp", "raquo", "rdquo", "rdquor", "rpar", "rsaquo", "rsquo", "rsquor",
        "sbquo", "semi", "thinsp", "tilde",
    ]);

    set.extend(["x3c", "x3e"]);

    // CSS
    set.extend([
        "lists", "side", "nav", "height", "auto", "border", "padding", "width",
    ]);

    // Perl PODs
    set.extend(["head1", "head2", "head3"]);

    // C literals and shell
    set.extend(["printf", "echo"]);

    set
});

/// Word pattern: alphanumerics (Unicode aware, no underscore) with an optional
/// `+` kept in the middle or at the end of a word, as in `GPL2+`.
static QUERY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^_\W]+\+?[^_\W]*").expect("Invalid regex pattern"));

/// Word pattern that also recognizes `{{...}}` template holes in rule texts.
static TEMPLATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{[^{}]*\}\}|[^_\W]+\+?[^_\W]*").expect("Invalid regex pattern")
});

const TEMPLATE_OPEN: &str = "{{";

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Lowercase a text and spell out the copyright sign so it yields a token.
fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    if lower.contains('©') {
        lower.replace('©', " c ")
    } else {
        lower
    }
}

/// Tokenize a query text into normalized tokens, dropping stopwords.
///
/// # Examples
/// ```
/// # use provenant_license::license_detection::tokenize::query_tokenizer;
/// let tokens = query_tokenizer("Hello World!");
/// assert_eq!(tokens, vec!["hello", "world"]);
/// ```
pub fn query_tokenizer(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let normalized = normalize(text);
    QUERY_PATTERN
        .find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|token| !is_stopword(token))
        .map(str::to_string)
        .collect()
}

/// Tokenize a text into `(token, line)` pairs with 1-based line numbers.
///
/// Stopwords are kept: this is the pre-tokenized stream accepted by
/// [`Query::from_tokens`](crate::license_detection::query::Query::from_tokens),
/// which drops and counts them.
pub fn tokenize_lines(text: &str) -> Vec<(String, usize)> {
    let mut tokens = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let normalized = normalize(line);
        tokens.extend(
            QUERY_PATTERN
                .find_iter(&normalized)
                .map(|m| (m.as_str().to_string(), idx + 1)),
        );
    }
    tokens
}

/// Tokenize a text against a vocabulary.
///
/// Returns one `(token id, line)` pair per non-stopword token. Tokens unknown to
/// the vocabulary have no id.
pub fn tokenize(text: &str, vocabulary: &Vocabulary) -> Vec<(Option<TokenId>, usize)> {
    tokenize_lines(text)
        .into_iter()
        .filter(|(token, _)| !is_stopword(token))
        .map(|(token, line)| (vocabulary.get(&token), line))
        .collect()
}

/// Tokenize a rule text, yielding `None` for each `{{...}}` template hole.
///
/// Leading and trailing holes are dropped and consecutive holes collapse into
/// one, so a `None` is always surrounded by word tokens.
pub fn rule_tokenizer(text: &str) -> Vec<Option<String>> {
    let normalized = normalize(text);
    let mut tokens: Vec<Option<String>> = Vec::new();
    for m in TEMPLATE_PATTERN.find_iter(&normalized) {
        let token = m.as_str();
        if token.starts_with(TEMPLATE_OPEN) {
            if matches!(tokens.last(), Some(Some(_))) {
                tokens.push(None);
            }
        } else if !is_stopword(token) {
            tokens.push(Some(token.to_string()));
        }
    }
    if matches!(tokens.last(), Some(None)) {
        tokens.pop();
    }
    tokens
}

/// Split a rule text into its word tokens and the set of gap positions.
///
/// A gap position `p` means that a template hole follows the token at `p`.
pub fn rule_tokens_and_gaps(text: &str) -> (Vec<String>, BTreeSet<usize>) {
    let mut tokens = Vec::new();
    let mut gaps = BTreeSet::new();
    for token in rule_tokenizer(text) {
        match token {
            Some(token) => tokens.push(token),
            None => {
                gaps.insert(tokens.len() - 1);
            }
        }
    }
    (tokens, gaps)
}

/// Sliding windows of `n` token ids with their start position.
pub fn ngrams(tokens: &[TokenId], n: usize) -> impl Iterator<Item = (usize, &[TokenId])> {
    tokens.windows(n.max(1)).enumerate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_tokenizer_basic() {
        assert_eq!(query_tokenizer("Hello World!"), vec!["hello", "world"]);
    }

    #[test]
    fn test_query_tokenizer_empty() {
        assert!(query_tokenizer("").is_empty());
        assert!(query_tokenizer("  \n\t ").is_empty());
    }

    #[test]
    fn test_query_tokenizer_keeps_plus_and_drops_underscore() {
        assert_eq!(
            query_tokenizer("GPL2+ or some_thing"),
            vec!["gpl2+", "or", "some", "thing"]
        );
    }

    #[test]
    fn test_query_tokenizer_drops_stopwords() {
        assert_eq!(
            query_tokenizer("<div>Licensed</div> &amp; <br/>free"),
            vec!["licensed", "free"]
        );
    }

    #[test]
    fn test_query_tokenizer_copyright_sign() {
        assert_eq!(query_tokenizer("© 2020 Acme"), vec!["c", "2020", "acme"]);
    }

    #[test]
    fn test_query_tokenizer_unicode_words() {
        assert_eq!(query_tokenizer("Lizenz für Software"), vec!["lizenz", "für", "software"]);
    }

    #[test]
    fn test_tokenize_lines_numbers_are_one_based() {
        let tokens = tokenize_lines("MIT License\n\nCopyright holder");
        assert_eq!(
            tokens,
            vec![
                ("mit".to_string(), 1),
                ("license".to_string(), 1),
                ("copyright".to_string(), 3),
                ("holder".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_tokenize_lines_keeps_stopwords() {
        let tokens = tokenize_lines("<p>Licensed\n&amp; free");
        let words: Vec<&str> = tokens.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(words, vec!["p", "licensed", "amp", "free"]);
        assert_eq!(tokens[2].1, 2);
    }

    #[test]
    fn test_tokenize_against_vocabulary() {
        let mut vocab = Vocabulary::new();
        let mit = vocab.get_or_assign("mit").unwrap();
        let license = vocab.get_or_assign("license").unwrap();

        let tokens = tokenize("<p>MIT</p> License\n\nunknown words", &vocab);
        assert_eq!(
            tokens,
            vec![(Some(mit), 1), (Some(license), 1), (None, 3), (None, 3)]
        );
        assert!(tokenize("", &vocab).is_empty());
    }

    #[test]
    fn test_rule_tokenizer_gaps_collapse() {
        let tokens = rule_tokenizer("{{name}} Copyright {{year}} {{holder}} All rights {{x}}");
        assert_eq!(
            tokens,
            vec![
                Some("copyright".to_string()),
                None,
                Some("all".to_string()),
                Some("rights".to_string()),
            ]
        );
    }

    #[test]
    fn test_rule_tokens_and_gaps() {
        let (tokens, gaps) = rule_tokens_and_gaps("Copyright {{holder}} all rights reserved");
        assert_eq!(tokens, vec!["copyright", "all", "rights", "reserved"]);
        assert_eq!(gaps.into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_rule_tokenizer_plain_braces_are_not_holes() {
        let (tokens, gaps) = rule_tokens_and_gaps("int main() { return 0; }");
        assert_eq!(tokens, vec!["int", "main", "return", "0"]);
        assert!(gaps.is_empty());
    }

    #[test]
    fn test_ngrams() {
        let tokens = [1u16, 2, 3, 4];
        let grams: Vec<_> = ngrams(&tokens, 3).collect();
        assert_eq!(grams, vec![(0, &[1u16, 2, 3][..]), (1, &[2u16, 3, 4][..])]);
        assert_eq!(ngrams(&tokens, 5).count(), 0);
    }
}
