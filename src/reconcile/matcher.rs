//! Pairwise similarity between movements.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

use crate::config::{MatchPolicyKind, MatchingConfig};
use crate::models::Movement;

/// Decides whether two movements look like the same charge.
///
/// Implementations must be symmetric: `is_similar(a, b) == is_similar(b, a)`.
pub trait SimilarityPolicy: Send + Sync {
    fn is_similar(&self, a: &Movement, b: &Movement) -> bool;
}

fn amounts_close(a: &Movement, b: &Movement, tolerance: Decimal) -> bool {
    // Raw amounts, without currency conversion between domains.
    (a.amount - b.amount).abs() <= tolerance
}

fn words(description: &str) -> impl Iterator<Item = &str> {
    description.split(' ').filter(|word| !word.is_empty())
}

fn any_word_within(words_of: &str, haystack: &str) -> bool {
    words(words_of).any(|word| haystack.contains(word))
}

/// Loose heuristic: amounts within tolerance and one description containing
/// any word of the other, case-sensitively.
///
/// Words come from splitting on single spaces with empty pieces skipped, so
/// stray spaces never count as a shared word.
#[derive(Debug, Clone)]
pub struct WordOverlap {
    amount_tolerance: Decimal,
}

impl WordOverlap {
    pub fn new(amount_tolerance: Decimal) -> Self {
        Self { amount_tolerance }
    }
}

impl Default for WordOverlap {
    fn default() -> Self {
        Self::new(MatchingConfig::default().amount_tolerance)
    }
}

impl SimilarityPolicy for WordOverlap {
    fn is_similar(&self, a: &Movement, b: &Movement) -> bool {
        amounts_close(a, b, self.amount_tolerance)
            && (any_word_within(&a.description, &b.description)
                || any_word_within(&b.description, &a.description))
    }
}

/// Whole-word comparison with length, case and overlap thresholds.
#[derive(Debug, Clone)]
pub struct StrictWordOverlap {
    amount_tolerance: Decimal,
    ignore_case: bool,
    min_word_len: usize,
    min_shared_words: usize,
}

impl StrictWordOverlap {
    pub fn new(
        amount_tolerance: Decimal,
        ignore_case: bool,
        min_word_len: usize,
        min_shared_words: usize,
    ) -> Self {
        Self {
            amount_tolerance,
            ignore_case,
            min_word_len,
            min_shared_words: min_shared_words.max(1),
        }
    }

    fn word_set(&self, description: &str) -> BTreeSet<String> {
        words(description)
            .filter(|word| word.chars().count() >= self.min_word_len)
            .map(|word| {
                if self.ignore_case {
                    word.to_lowercase()
                } else {
                    word.to_string()
                }
            })
            .collect()
    }
}

impl SimilarityPolicy for StrictWordOverlap {
    fn is_similar(&self, a: &Movement, b: &Movement) -> bool {
        if !amounts_close(a, b, self.amount_tolerance) {
            return false;
        }
        let left = self.word_set(&a.description);
        let right = self.word_set(&b.description);
        left.intersection(&right).count() >= self.min_shared_words
    }
}

/// Build the configured policy.
pub fn policy_from_config(config: &MatchingConfig) -> Box<dyn SimilarityPolicy> {
    match config.policy {
        MatchPolicyKind::Weak => Box::new(WordOverlap::new(config.amount_tolerance)),
        MatchPolicyKind::Strict => Box::new(StrictWordOverlap::new(
            config.amount_tolerance,
            config.ignore_case,
            config.min_word_len,
            config.min_shared_words,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovementKind;
    use std::str::FromStr;

    fn movement(amount: &str, description: &str) -> Movement {
        Movement::new(
            MovementKind::National,
            Decimal::from_str(amount).unwrap(),
            description,
        )
    }

    #[test]
    fn weak_policy_needs_close_amounts_and_a_shared_word() {
        let policy = WordOverlap::default();
        assert!(policy.is_similar(&movement("5990", "NETFLIX COM"), &movement("5990.5", "NETFLIX")));
        assert!(!policy.is_similar(&movement("5990", "NETFLIX COM"), &movement("5991", "NETFLIX COM")));
        assert!(!policy.is_similar(&movement("5990", "NETFLIX COM"), &movement("5990", "SPOTIFY")));
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        let policy = WordOverlap::new(Decimal::from_str("0.6").unwrap());
        assert!(policy.is_similar(&movement("10", "A"), &movement("10.6", "A")));
        assert!(!policy.is_similar(&movement("10", "A"), &movement("10.61", "A")));
    }

    #[test]
    fn weak_policy_matches_word_substrings() {
        let policy = WordOverlap::default();
        // "UBER" is a substring of "UBERTRIP".
        assert!(policy.is_similar(&movement("100", "UBER"), &movement("100", "UBERTRIP SANTIAGO")));
        assert!(!policy.is_similar(&movement("100", "UBER"), &movement("100", "uber eats")));
    }

    #[test]
    fn leading_spaces_do_not_match_everything() {
        let policy = WordOverlap::default();
        assert!(!policy.is_similar(&movement("100", " NETFLIX"), &movement("100", "SPOTIFY")));
    }

    #[test]
    fn policies_are_symmetric() {
        let pairs = [
            ("100", "UBER", "100", "UBER EATS SANTIAGO"),
            ("100", "UBER EATS", "100.4", "UBER"),
            ("100", "NETFLIX.COM", "100", "NETFLIX"),
            ("100", "A B", "100", "AB"),
            ("100", "uber eats", "100", "UBER"),
            ("100", "SPOTIFY", "101", "SPOTIFY"),
            ("100", "", "100", "SPOTIFY"),
        ];
        let weak = WordOverlap::default();
        let strict = StrictWordOverlap::new(Decimal::from_str("0.6").unwrap(), true, 3, 1);

        for (amount_a, desc_a, amount_b, desc_b) in pairs {
            let a = movement(amount_a, desc_a);
            let b = movement(amount_b, desc_b);
            assert_eq!(weak.is_similar(&a, &b), weak.is_similar(&b, &a), "{desc_a} / {desc_b}");
            assert_eq!(strict.is_similar(&a, &b), strict.is_similar(&b, &a), "{desc_a} / {desc_b}");
        }
    }

    #[test]
    fn strict_policy_requires_whole_words() {
        let policy = StrictWordOverlap::new(Decimal::from_str("0.6").unwrap(), true, 3, 1);
        assert!(policy.is_similar(&movement("100", "uber eats"), &movement("100", "UBER")));
        assert!(!policy.is_similar(&movement("100", "UBERTRIP"), &movement("100", "UBER")));
        // Short words are ignored.
        assert!(!policy.is_similar(&movement("100", "PAGO EN LINEA"), &movement("100", "EN")));
    }

    #[test]
    fn strict_policy_counts_shared_words() {
        let policy = StrictWordOverlap::new(Decimal::from_str("0.6").unwrap(), false, 1, 2);
        assert!(policy.is_similar(&movement("100", "APPLE COM BILL"), &movement("100", "APPLE COM")));
        assert!(!policy.is_similar(&movement("100", "APPLE COM BILL"), &movement("100", "APPLE")));
    }

    #[test]
    fn config_selects_policy() {
        let mut config = MatchingConfig::default();
        let weak = policy_from_config(&config);
        assert!(weak.is_similar(&movement("100", "UBERTRIP"), &movement("100", "UBER")));

        config.policy = MatchPolicyKind::Strict;
        let strict = policy_from_config(&config);
        assert!(!strict.is_similar(&movement("100", "UBERTRIP"), &movement("100", "UBER")));
    }
}
