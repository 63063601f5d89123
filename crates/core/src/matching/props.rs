//! Property-based tests for the product matcher.

use proptest::prelude::*;
use restaurantek_shared::types::CommonProductId;
use rust_decimal::Decimal;

use super::{DEFAULT_LIMIT, MIN_SCORE, MatchCandidate, find_matches, normalize_name, similarity};

fn product_name() -> impl Strategy<Value = String> {
    "[A-Za-z ,()#0-9-]{0,24}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Similarity stays within [0, 1]; identical names score 1.
    #[test]
    fn prop_similarity_bounded(a in product_name(), b in product_name()) {
        let score = similarity(&a, &b);
        prop_assert!(score >= Decimal::ZERO);
        prop_assert!(score <= Decimal::ONE);
        prop_assert_eq!(similarity(&a, &a), Decimal::ONE);
    }

    /// Case and punctuation never change a score.
    #[test]
    fn prop_similarity_ignores_case(a in product_name(), b in product_name()) {
        prop_assert_eq!(similarity(&a, &b), similarity(&a.to_uppercase(), &b.to_lowercase()));
    }

    /// Normalizing twice changes nothing.
    #[test]
    fn prop_normalize_idempotent(a in product_name()) {
        let once = normalize_name(&a);
        prop_assert_eq!(normalize_name(&once), once.clone());
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        prop_assert!(!once.contains("  "));
    }

    /// Results respect the limit, the threshold and the ordering.
    #[test]
    fn prop_find_matches_contract(
        query in product_name(),
        names in prop::collection::vec(product_name(), 0..12),
    ) {
        let candidates: Vec<MatchCandidate> = names
            .into_iter()
            .map(|name| MatchCandidate { id: CommonProductId::new(), name })
            .collect();
        let matches = find_matches(&query, &candidates, DEFAULT_LIMIT);

        prop_assert!(matches.len() <= DEFAULT_LIMIT);
        for m in &matches {
            prop_assert!(m.score >= MIN_SCORE.round_dp(4));
        }
        for pair in matches.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }
}
