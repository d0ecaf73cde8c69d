//! Common license-specific words (legalese).
//!
//! Legalese words are high-value tokens for license detection. They get the
//! lowest token ids in the vocabulary so that "is this a legalese token" is a
//! single comparison against `len_legalese`.
//!
//! Words in the same group are spelling or inflection variants and share one
//! token id.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::license_detection::index::vocabulary::TokenId;

const LEGALESE_GROUPS: &[&[&str]] = &[
    &["license", "licence", "licenses", "licences"],
    &["licensed", "licenced"],
    &["licensing", "licencing"],
    &["licensor", "licensors", "licenser"],
    &["licensee", "licensees"],
    &["sublicense", "sublicence", "sublicenses", "sublicensable"],
    &["copyright", "copyrights", "copyrighted"],
    &["copyleft"],
    &["redistribute", "redistributed", "redistributing"],
    &["redistribution", "redistributions"],
    &["distribute", "distributed", "distributing"],
    &["distribution", "distributions"],
    &["permission", "permissions"],
    &["permit", "permits", "permitted"],
    &["warranty", "warranties"],
    &["warrant", "warrants", "warranted"],
    &["merchantability", "merchantable"],
    &["fitness"],
    &["liability", "liabilities"],
    &["liable"],
    &["damages", "damage"],
    &["disclaimer", "disclaimers"],
    &["disclaim", "disclaimed", "disclaims"],
    &["notice", "notices"],
    &["conditions", "condition"],
    &["restriction", "restrictions", "restricted"],
    &["derivative", "derivatives"],
    &["modification", "modifications"],
    &["modify", "modified", "modifying"],
    &["contribution", "contributions"],
    &["contributor", "contributors"],
    &["patent", "patents", "patented"],
    &["trademark", "trademarks"],
    &["infringement", "infringe", "infringing"],
    &["grant", "grants"],
    &["granted"],
    &["hereby"],
    &["herein", "hereunder", "hereinafter"],
    &["thereof", "therein", "whereof"],
    &["provided"],
    &["furnished", "furnish"],
    &["indemnify", "indemnification", "indemnity"],
    &["terminate", "terminated", "termination"],
    &["jurisdiction", "governing"],
    &["irrevocable", "perpetual", "worldwide"],
    &["royalty"],
    &["exclusive", "nonexclusive"],
    &["proprietary"],
    &["consequential", "incidental"],
    &["tort", "negligence"],
    &["contract", "contractual"],
    &["statutory"],
    &["express", "expressly"],
    &["implied"],
    &["obligation", "obligations", "obligate"],
    &["compliance", "comply", "complies"],
    &["accordance", "pursuant"],
    &["notwithstanding", "foregoing", "aforementioned"],
    &["enforceable", "unenforceable"],
    &["agreement", "agreements"],
    &["covenant", "covenants"],
    &["attribution"],
    &["endorse", "promote"],
    &["acknowledge", "acknowledgement", "acknowledgment"],
    &["guarantee", "guaranty"],
    &["intellectual"],
    &["gpl", "gplv2", "gplv3"],
    &["lgpl", "lgplv2", "lgplv3"],
    &["mit"],
    &["bsd"],
    &["apache"],
    &["mozilla", "mpl"],
];

/// Legalese word to token id mapping. Ids are dense, `0..legalese_count()`.
pub static LEGALESE: Lazy<HashMap<&'static str, TokenId>> = Lazy::new(|| {
    LEGALESE_GROUPS
        .iter()
        .enumerate()
        .flat_map(|(id, words)| words.iter().map(move |word| (*word, id as TokenId)))
        .collect()
});

/// Get the legalese token id for a word, if it is legalese.
pub fn get_legalese_token(word: &str) -> Option<TokenId> {
    LEGALESE.get(word).copied()
}

pub fn is_legalese(word: &str) -> bool {
    LEGALESE.contains_key(word)
}

/// Number of distinct legalese token ids.
pub fn legalese_count() -> usize {
    LEGALESE_GROUPS.len()
}

/// The canonical word of each legalese id, ordered by id.
pub fn legalese_words() -> impl Iterator<Item = &'static str> {
    LEGALESE_GROUPS.iter().filter_map(|words| words.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variants_share_an_id() {
        assert_eq!(get_legalese_token("license"), get_legalese_token("licence"));
        assert_eq!(get_legalese_token("warranty"), get_legalese_token("warranties"));
        assert_ne!(get_legalese_token("license"), get_legalese_token("copyright"));
    }

    #[test]
    fn test_ids_are_dense() {
        let max_id = LEGALESE.values().max().copied().unwrap_or_default();
        assert_eq!(max_id as usize + 1, legalese_count());
        assert_eq!(legalese_words().count(), legalese_count());
    }

    #[test]
    fn test_no_word_in_two_groups() {
        let total: usize = LEGALESE_GROUPS.iter().map(|g| g.len()).sum();
        assert_eq!(total, LEGALESE.len());
    }

    #[test]
    fn test_is_legalese() {
        assert!(is_legalese("redistribution"));
        assert!(!is_legalese("banana"));
    }
}
