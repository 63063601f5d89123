//! Fuzzy matching of distributor product names to common products.
//!
//! Scores are the Ratcliff/Obershelp similarity `2 * M / T`, where `M` counts
//! characters in matching blocks and `T` is the combined length of both
//! normalized names.

mod sequence;

#[cfg(test)]
mod props;

use restaurantek_shared::types::CommonProductId;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub use sequence::matching_characters;

/// Scores below this are never suggested.
pub const MIN_SCORE: Decimal = Decimal::from_parts(60, 0, 0, false, 2);

/// Scores at or above this are high-confidence matches.
pub const HIGH_CONFIDENCE: Decimal = Decimal::from_parts(85, 0, 0, false, 2);

/// Suggestions returned when the caller does not ask for a number.
pub const DEFAULT_LIMIT: usize = 3;

/// How much to trust a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    /// Score of at least [`HIGH_CONFIDENCE`].
    High,
    /// Score between [`MIN_SCORE`] and [`HIGH_CONFIDENCE`].
    Medium,
}

/// A common product that can be matched against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Product id.
    pub id: CommonProductId,
    /// Product name as stored.
    pub name: String,
}

/// A scored candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSuggestion {
    /// Suggested common product.
    pub common_product_id: CommonProductId,
    /// Its name.
    pub name: String,
    /// Similarity in `[0, 1]`, 4 dp.
    pub score: Decimal,
    /// Confidence bucket.
    pub confidence: MatchConfidence,
}

/// Lowercases, replaces anything that is not a letter or digit with a space
/// and collapses runs of spaces.
///
/// ```
/// use restaurantek_core::matching::normalize_name;
///
/// assert_eq!(normalize_name("  Tomatoes, Roma (25#) "), "tomatoes roma 25");
/// ```
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let spaced: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity of two names after normalization, in `[0, 1]`.
///
/// Two empty names are identical.
#[must_use]
pub fn similarity(a: &str, b: &str) -> Decimal {
    let a: Vec<char> = normalize_name(a).chars().collect();
    let b: Vec<char> = normalize_name(b).chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return Decimal::ONE;
    }
    let matched = matching_characters(&a, &b);
    Decimal::from(2 * matched) / Decimal::from(total)
}

/// Returns the best `limit` candidates scoring at least [`MIN_SCORE`],
/// best first, ties by name.
#[must_use]
pub fn find_matches(
    query: &str,
    candidates: &[MatchCandidate],
    limit: usize,
) -> Vec<MatchSuggestion> {
    if normalize_name(query).is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(Decimal, &MatchCandidate)> = candidates
        .iter()
        .map(|candidate| (similarity(query, &candidate.name), candidate))
        .filter(|(score, _)| *score >= MIN_SCORE)
        .collect();

    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b.cmp(score_a).then_with(|| a.name.cmp(&b.name))
    });
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(score, candidate)| MatchSuggestion {
            common_product_id: candidate.id,
            name: candidate.name.clone(),
            score: score.round_dp_with_strategy(4, RoundingStrategy::MidpointNearestEven),
            confidence: if score >= HIGH_CONFIDENCE {
                MatchConfidence::High
            } else {
                MatchConfidence::Medium
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candidates(names: &[&str]) -> Vec<MatchCandidate> {
        names
            .iter()
            .map(|name| MatchCandidate {
                id: CommonProductId::new(),
                name: (*name).to_string(),
            })
            .collect()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Onions,  Yellow JUMBO"), "onions yellow jumbo");
        assert_eq!(normalize_name("---"), "");
        assert_eq!(normalize_name("Crème fraîche"), "crème fraîche");
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("Butter", "butter"), Decimal::ONE);
        assert_eq!(similarity("", "  "), Decimal::ONE);
        assert_eq!(similarity("abc", ""), Decimal::ZERO);
        assert_eq!(similarity("abc", "xyz"), Decimal::ZERO);
    }

    #[test]
    fn test_similarity_known_ratios() {
        // "abcd" vs "bcde": block "bcd", 2*3/8
        assert_eq!(similarity("abcd", "bcde"), dec!(0.75));
        // "tomato" vs "tomatoes": 2*6/14
        assert_eq!(similarity("tomato", "tomatoes").round_dp(4), dec!(0.8571));
    }

    #[test]
    fn test_find_matches_orders_and_limits() {
        let catalog = candidates(&[
            "Tomatoes",
            "Tomato Paste",
            "Roma Tomatoes",
            "Potatoes",
            "Heavy Cream",
        ]);

        let matches = find_matches("tomatoes roma", &catalog, DEFAULT_LIMIT);
        assert!(!matches.is_empty());
        assert!(matches.len() <= DEFAULT_LIMIT);
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(matches.iter().all(|m| m.score >= MIN_SCORE));
        assert!(matches.iter().all(|m| m.name != "Heavy Cream"));
    }

    #[test]
    fn test_exact_match_is_high_confidence() {
        let catalog = candidates(&["Butter, Unsalted", "Buttermilk"]);
        let matches = find_matches("BUTTER UNSALTED", &catalog, 3);

        assert_eq!(matches[0].name, "Butter, Unsalted");
        assert_eq!(matches[0].score, Decimal::ONE);
        assert_eq!(matches[0].confidence, MatchConfidence::High);
    }

    #[test]
    fn test_medium_confidence_band() {
        let catalog = candidates(&["Tomato Paste"]);
        // close but not exact
        let matches = find_matches("tomatoes paste", &catalog, 3);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].confidence, MatchConfidence::High);

        let catalog = candidates(&["Chicken Breast"]);
        let matches = find_matches("chicken thigh", &catalog, 3);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].confidence, MatchConfidence::Medium);
    }

    #[test]
    fn test_ties_sorted_by_name() {
        let catalog = candidates(&["Milk B", "Milk A"]);
        let matches = find_matches("milk", &catalog, 3);
        let names: Vec<_> = matches.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Milk A", "Milk B"]);
    }

    #[test]
    fn test_empty_query_or_limit() {
        let catalog = candidates(&["Salt"]);
        assert!(find_matches("  ", &catalog, 3).is_empty());
        assert!(find_matches("salt", &catalog, 0).is_empty());
        assert!(find_matches("salt", &[], 3).is_empty());
    }
}
