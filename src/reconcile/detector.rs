//! Recurring-charge detection over a card's single-payment movements.

use crate::models::Movement;

use super::matcher::SimilarityPolicy;

/// Minimum number of other movements a candidate must resemble.
pub const MIN_OTHER_OCCURRENCES: usize = 2;

/// Find single-payment charges that show up at least three times in `pool`.
///
/// Candidates are visited in input order and the first qualifying occurrence
/// represents its group; later candidates similar to an accepted one are
/// skipped. Occurrences are counted over the whole pool, installment
/// movements included, excluding the candidate itself by id.
pub fn detect_recurring(pool: &[Movement], policy: &dyn SimilarityPolicy) -> Vec<Movement> {
    let mut recurring: Vec<Movement> = Vec::new();

    for candidate in pool.iter().filter(|m| m.is_single_payment()) {
        if recurring
            .iter()
            .any(|accepted| policy.is_similar(candidate, accepted))
        {
            continue;
        }

        let occurrences = pool
            .iter()
            .filter(|other| other.id != candidate.id)
            .filter(|other| policy.is_similar(candidate, other))
            .count();

        if occurrences >= MIN_OTHER_OCCURRENCES {
            tracing::debug!(
                description = %candidate.description,
                amount = %candidate.amount,
                occurrences = occurrences + 1,
                "recurring charge detected"
            );
            recurring.push(candidate.clone());
        }
    }

    recurring
}
