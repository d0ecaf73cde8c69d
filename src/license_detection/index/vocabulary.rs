//! Token string to integer id mapping.
//!
//! The vocabulary is owned by one [`LicenseIndex`](super::LicenseIndex). It is
//! filled while the index is built and never changes afterwards, so query
//! tokens missing from it simply have no id.

use anyhow::{Result, bail};
use std::collections::HashMap;

use crate::license_detection::rules::legalese::{LEGALESE, legalese_count, legalese_words};

/// Integer id of a token.
pub type TokenId = u16;

/// Token vocabulary.
///
/// Token ids are assigned as follows:
/// - ids `0..len_legalese`: legalese tokens, spelling variants share an id
/// - ids `len_legalese..`: every other rule token, in first-seen order
#[derive(Debug, Clone)]
pub struct Vocabulary {
    ids_by_token: HashMap<String, TokenId>,
    /// Canonical string of each id
    tokens_by_id: Vec<String>,
    len_legalese: usize,
}

impl Vocabulary {
    /// Create an empty vocabulary without legalese.
    pub fn new() -> Self {
        Self {
            ids_by_token: HashMap::new(),
            tokens_by_id: Vec::new(),
            len_legalese: 0,
        }
    }

    /// Create a vocabulary seeded with the legalese words.
    pub fn with_legalese() -> Self {
        let ids_by_token = LEGALESE
            .iter()
            .map(|(word, id)| (word.to_string(), *id))
            .collect();
        Self {
            ids_by_token,
            tokens_by_id: legalese_words().map(str::to_string).collect(),
            len_legalese: legalese_count(),
        }
    }

    /// Get the id of a token, assigning the next free id to a new token.
    ///
    /// Fails once the id space of [`TokenId`] is exhausted.
    pub fn get_or_assign(&mut self, token: &str) -> Result<TokenId> {
        if let Some(&id) = self.ids_by_token.get(token) {
            return Ok(id);
        }
        let next = self.tokens_by_id.len();
        if next > TokenId::MAX as usize {
            bail!(
                "Token vocabulary overflow: more than {} distinct tokens",
                TokenId::MAX as usize + 1
            );
        }
        let id = next as TokenId;
        self.ids_by_token.insert(token.to_string(), id);
        self.tokens_by_id.push(token.to_string());
        Ok(id)
    }

    /// Append tokens to the legalese id range.
    ///
    /// Must run before any non-legalese token is assigned.
    pub fn extend_legalese<'a>(&mut self, tokens: impl IntoIterator<Item = &'a str>) -> Result<()> {
        if self.tokens_by_id.len() != self.len_legalese {
            bail!("Legalese can only be extended before other tokens are assigned");
        }
        for token in tokens {
            if self.ids_by_token.contains_key(token) {
                continue;
            }
            self.get_or_assign(token)?;
            self.len_legalese += 1;
        }
        Ok(())
    }

    pub fn get(&self, token: &str) -> Option<TokenId> {
        self.ids_by_token.get(token).copied()
    }

    /// Canonical token string for an id.
    pub fn token(&self, id: TokenId) -> Option<&str> {
        self.tokens_by_id.get(id as usize).map(String::as_str)
    }

    #[inline]
    pub const fn is_legalese(&self, id: TokenId) -> bool {
        (id as usize) < self.len_legalese
    }

    /// Number of distinct token ids.
    pub fn len(&self) -> usize {
        self.tokens_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens_by_id.is_empty()
    }

    pub const fn len_legalese(&self) -> usize {
        self.len_legalese
    }

    /// Render token ids back to text, for logs.
    pub fn tokens_to_text(&self, ids: &[TokenId]) -> String {
        ids.iter()
            .map(|&id| self.token(id).unwrap_or("<unknown>"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let vocab = Vocabulary::new();
        assert!(vocab.is_empty());
        assert_eq!(vocab.len_legalese(), 0);
    }

    #[test]
    fn test_legalese_gets_lowest_ids() {
        let mut vocab = Vocabulary::with_legalese();
        let license = vocab.get("license").unwrap();
        assert!(vocab.is_legalese(license));
        assert_eq!(vocab.get("licence"), Some(license));

        let banana = vocab.get_or_assign("banana").unwrap();
        assert_eq!(banana as usize, vocab.len_legalese());
        assert!(!vocab.is_legalese(banana));
    }

    #[test]
    fn test_extend_legalese() {
        let mut vocab = Vocabulary::with_legalese();
        let before = vocab.len_legalese();
        vocab.extend_legalese(["1984", "license"]).unwrap();
        assert_eq!(vocab.len_legalese(), before + 1);
        assert!(vocab.is_legalese(vocab.get("1984").unwrap()));

        vocab.get_or_assign("banana").unwrap();
        assert!(vocab.extend_legalese(["2001"]).is_err());
    }

    #[test]
    fn test_get_or_assign_is_stable() {
        let mut vocab = Vocabulary::new();
        let a = vocab.get_or_assign("alpha").unwrap();
        let b = vocab.get_or_assign("beta").unwrap();
        assert_eq!(vocab.get_or_assign("alpha").unwrap(), a);
        assert_eq!((a, b), (0, 1));
        assert_eq!(vocab.token(b), Some("beta"));
        assert_eq!(vocab.get("gamma"), None);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut vocab = Vocabulary::new();
        for i in 0..=TokenId::MAX as usize {
            vocab.get_or_assign(&format!("t{i}")).unwrap();
        }
        assert!(vocab.get_or_assign("one-too-many").is_err());
        assert!(vocab.get_or_assign("t0").is_ok());
    }

    #[test]
    fn test_tokens_to_text() {
        let mut vocab = Vocabulary::new();
        let ids = [
            vocab.get_or_assign("mit").unwrap(),
            vocab.get_or_assign("rocks").unwrap(),
        ];
        assert_eq!(vocab.tokens_to_text(&ids), "mit rocks");
    }
}
