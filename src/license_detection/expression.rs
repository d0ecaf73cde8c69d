//! License expression parsing.
//!
//! Rule metadata carries a license expression made of license keys joined by
//! `AND`, `OR` and `WITH` (case-insensitive) with parenthetical grouping, e.g.
//! `gpl-2.0-plus WITH classpath-exception-2.0 OR mit`. Expressions are parsed
//! when rules are loaded so that a malformed expression fails early, and the
//! license keys are used to compare the licensing of two matches.

use std::collections::BTreeSet;
use std::fmt;

/// Error type for license expression parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    EmptyExpression,

    /// Character that cannot appear in an expression
    UnexpectedCharacter { character: char, position: usize },

    MismatchedParentheses,

    /// Operator without an operand, or two operands without an operator
    MisplacedToken { token: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyExpression => write!(f, "Empty license expression"),
            Self::UnexpectedCharacter {
                character,
                position,
            } => write!(
                f,
                "Unexpected character '{}' at position {}",
                character, position
            ),
            Self::MismatchedParentheses => write!(f, "Mismatched parentheses"),
            Self::MisplacedToken { token } => write!(f, "Misplaced token '{}'", token),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Key(String),
    And,
    Or,
    With,
    LeftParen,
    RightParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Key(key) => write!(f, "{}", key),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::With => write!(f, "WITH"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
        }
    }
}

/// A parsed license expression.
#[derive(Debug, Clone, PartialEq)]
pub enum LicenseExpression {
    /// A single lowercase license key
    License(String),
    And(Box<LicenseExpression>, Box<LicenseExpression>),
    Or(Box<LicenseExpression>, Box<LicenseExpression>),
    /// A license with an exception
    With(Box<LicenseExpression>, Box<LicenseExpression>),
}

impl LicenseExpression {
    /// All distinct license keys of the expression, sorted.
    pub fn license_keys(&self) -> Vec<String> {
        let mut keys = BTreeSet::new();
        self.collect_keys(&mut keys);
        keys.into_iter().collect()
    }

    fn collect_keys(&self, keys: &mut BTreeSet<String>) {
        match self {
            Self::License(key) => {
                keys.insert(key.clone());
            }
            Self::And(left, right) | Self::Or(left, right) | Self::With(left, right) => {
                left.collect_keys(keys);
                right.collect_keys(keys);
            }
        }
    }
}

impl fmt::Display for LicenseExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn wrapped(expr: &LicenseExpression) -> String {
            match expr {
                LicenseExpression::License(_) | LicenseExpression::With(_, _) => expr.to_string(),
                _ => format!("({})", expr),
            }
        }
        match self {
            Self::License(key) => write!(f, "{}", key),
            Self::And(left, right) => write!(f, "{} AND {}", wrapped(left), wrapped(right)),
            Self::Or(left, right) => write!(f, "{} OR {}", wrapped(left), wrapped(right)),
            Self::With(left, right) => write!(f, "{} WITH {}", left, right),
        }
    }
}

/// Parse a license expression string.
///
/// # Examples
/// ```
/// use provenant_license::license_detection::expression::parse_expression;
///
/// let expr = parse_expression("MIT AND Apache-2.0").unwrap();
/// assert_eq!(expr.license_keys(), vec!["apache-2.0", "mit"]);
/// ```
pub fn parse_expression(expr: &str) -> Result<LicenseExpression, ParseError> {
    let tokens = tokenize(expr.trim())?;
    if tokens.is_empty() {
        return Err(ParseError::EmptyExpression);
    }
    let (parsed, remaining) = parse_or(&tokens)?;
    match remaining.first() {
        None => Ok(parsed),
        Some(Token::RightParen) => Err(ParseError::MismatchedParentheses),
        Some(token) => Err(ParseError::MisplacedToken {
            token: token.to_string(),
        }),
    }
}

/// True if two expressions name the same set of license keys.
///
/// Unparsable expressions only compare equal to an identical string.
pub fn same_licensing(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (parse_expression(a), parse_expression(b)) {
        (Ok(a), Ok(b)) => a.license_keys() == b.license_keys(),
        _ => false,
    }
}

/// Combine distinct expressions with `AND`, sorted for a stable output.
///
/// Compound expressions are parenthesized. Returns `None` for no expression.
pub fn combine_license_expressions(
    expressions: impl IntoIterator<Item = String>,
) -> Option<String> {
    let unique: BTreeSet<String> = expressions.into_iter().collect();
    if unique.is_empty() {
        return None;
    }
    let combined = unique
        .iter()
        .map(|expr| {
            if expr.contains(' ') && !(expr.starts_with('(') && expr.ends_with(')')) {
                format!("({})", expr)
            } else {
                expr.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ");
    Some(combined)
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::LeftParen),
            ')' => tokens.push(Token::RightParen),
            c if is_key_char(c) => {
                let mut word = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if !is_key_char(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(match word.to_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "WITH" => Token::With,
                    _ => Token::Key(word.to_lowercase()),
                });
            }
            _ => {
                return Err(ParseError::UnexpectedCharacter {
                    character: c,
                    position: pos,
                });
            }
        }
    }

    Ok(tokens)
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | '+' | ':')
}

type Parsed<'a> = Result<(LicenseExpression, &'a [Token]), ParseError>;

fn parse_or(tokens: &[Token]) -> Parsed<'_> {
    let (mut expr, mut remaining) = parse_and(tokens)?;
    while let Some(Token::Or) = remaining.first() {
        let (right, rest) = parse_and(&remaining[1..])?;
        expr = LicenseExpression::Or(Box::new(expr), Box::new(right));
        remaining = rest;
    }
    Ok((expr, remaining))
}

fn parse_and(tokens: &[Token]) -> Parsed<'_> {
    let (mut expr, mut remaining) = parse_with(tokens)?;
    while let Some(Token::And) = remaining.first() {
        let (right, rest) = parse_with(&remaining[1..])?;
        expr = LicenseExpression::And(Box::new(expr), Box::new(right));
        remaining = rest;
    }
    Ok((expr, remaining))
}

fn parse_with(tokens: &[Token]) -> Parsed<'_> {
    let (mut expr, mut remaining) = parse_primary(tokens)?;
    while let Some(Token::With) = remaining.first() {
        let (right, rest) = parse_primary(&remaining[1..])?;
        expr = LicenseExpression::With(Box::new(expr), Box::new(right));
        remaining = rest;
    }
    Ok((expr, remaining))
}

fn parse_primary(tokens: &[Token]) -> Parsed<'_> {
    match tokens.first() {
        None => Err(ParseError::EmptyExpression),
        Some(Token::Key(key)) => Ok((LicenseExpression::License(key.clone()), &tokens[1..])),
        Some(Token::LeftParen) => {
            let (expr, remaining) = parse_or(&tokens[1..])?;
            match remaining.first() {
                Some(Token::RightParen) => Ok((expr, &remaining[1..])),
                _ => Err(ParseError::MismatchedParentheses),
            }
        }
        Some(Token::RightParen) => Err(ParseError::MismatchedParentheses),
        Some(token) => Err(ParseError::MisplacedToken {
            token: token.to_string(),
        }),
    }
}
