//! Fuzzy payment reference matching
//!
//! Members type the payment reference into their bank's free-text field, often with
//! extra words around it and the occasional typo. `distance` scores how well a
//! reference appears in such a description:
//!
//! - `0` when the description contains the reference verbatim (case-insensitive)
//! - otherwise `1 +` the smallest weighted edit distance between the reference and any
//!   5-character window of the description (or the whole description when it is
//!   shorter than 6 characters)
//!
//! # Edit costs
//!
//! The edit turns the reference into the window. Inserting characters is free, since a
//! window is wider than a typical reference and the surplus is just surrounding text.
//! Substituting a character costs 1. Deleting a reference character costs 10, so a
//! window that lost part of the reference never passes for a match.

/// Width of the description windows compared against the reference
pub const WINDOW: usize = 5;

/// Per-operation costs of the weighted edit distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditCosts {
    pub insert: usize,
    pub substitute: usize,
    pub delete: usize,
}

/// Costs used for payment references
pub const REFERENCE_COSTS: EditCosts = EditCosts {
    insert: 0,
    substitute: 1,
    delete: 10,
};

/// Match distance between a payment reference and a transaction description
///
/// # Arguments
///
/// * `reference` - Payment reference the member was asked to quote
/// * `text` - Free-text description from the bank statement
///
/// # Returns
///
/// `0` for a verbatim (case-insensitive) hit, otherwise one plus the best window
/// distance. Reconciliation accepts distances up to its configured threshold.
pub fn distance(reference: &str, text: &str) -> usize {
    let reference = reference.to_uppercase();
    let text = text.to_uppercase();

    if text.contains(&reference) {
        return 0;
    }

    let reference: Vec<char> = reference.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let best = if text.len() < WINDOW + 1 {
        weighted_levenshtein(&reference, &text, REFERENCE_COSTS)
    } else {
        text.windows(WINDOW)
            .map(|window| weighted_levenshtein(&reference, window, REFERENCE_COSTS))
            .min()
            .unwrap_or(usize::MAX - 1)
    };

    best + 1
}

/// Weighted edit distance turning `from` into `to`
///
/// Two-row dynamic programme; `O(from.len() * to.len())` time, `O(to.len())` space.
pub fn weighted_levenshtein(from: &[char], to: &[char], costs: EditCosts) -> usize {
    let mut previous: Vec<usize> = (0..=to.len()).map(|j| j * costs.insert).collect();
    let mut current = vec![0; to.len() + 1];

    for (i, &a) in from.iter().enumerate() {
        current[0] = (i + 1) * costs.delete;
        for (j, &b) in to.iter().enumerate() {
            let substitute = previous[j] + if a == b { 0 } else { costs.substitute };
            let delete = previous[j + 1] + costs.delete;
            let insert = current[j] + costs.insert;
            current[j + 1] = substitute.min(delete).min(insert);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[to.len()]
}
