//! Matching-block search in the style of a sequence matcher.

/// Counts the characters covered by the matching blocks of `a` and `b`.
///
/// The longest common block is taken first (earliest in `a`, then in `b`,
/// on ties) and the search recurses into the unmatched pieces on either side.
#[must_use]
pub fn matching_characters<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, a_lo, a_hi, b_lo, b_hi);
        if size == 0 {
            continue;
        }
        matched += size;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + size < a_hi && j + size < b_hi {
            pending.push((i + size, a_hi, j + size, b_hi));
        }
    }
    matched
}

/// Longest common block within `a[a_lo..a_hi]` and `b[b_lo..b_hi]`.
fn longest_match<T: PartialEq>(
    a: &[T],
    b: &[T],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (a_lo, b_lo, 0);
    // run[j + 1] = length of the match ending at a[i - 1], b[j]
    let mut previous = vec![0usize; b_hi - b_lo + 1];
    let mut current = vec![0usize; b_hi - b_lo + 1];

    for i in a_lo..a_hi {
        for j in b_lo..b_hi {
            let slot = j - b_lo + 1;
            if a[i] == b[j] {
                let run = previous[slot - 1] + 1;
                current[slot] = run;
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            } else {
                current[slot] = 0;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        matching_characters(&a, &b)
    }

    #[test]
    fn test_identical() {
        assert_eq!(count("flour", "flour"), 5);
    }

    #[test]
    fn test_disjoint() {
        assert_eq!(count("abc", "xyz"), 0);
        assert_eq!(count("", "xyz"), 0);
    }

    #[test]
    fn test_blocks_on_both_sides() {
        // "tomato" + " paste" blocks around the extra "es"
        assert_eq!(count("tomatoes paste", "tomato paste"), 12);
    }

    #[test]
    fn test_reordered_words_match_partially() {
        // longest block "tomatoes" leaves nothing matchable on the right of b
        assert_eq!(count("tomatoes roma", "roma tomatoes"), 8);
    }
}
