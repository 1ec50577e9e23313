//! String similarity used to pair epic names across documents.

#![allow(clippy::needless_range_loop)] // DP table indexing

/// Similarity ratio in `[0, 1]`: `2 * LCS / (|a| + |b|)` over the lower-cased,
/// trimmed characters of both strings. Two empty strings score `1.0`.
pub fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.trim().to_lowercase().chars().collect();
    let b: Vec<char> = b.trim().to_lowercase().chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * lcs_length(&a, &b) as f64 / total as f64
}

fn lcs_length(a: &[char], b: &[char]) -> usize {
    let m = a.len();
    let n = b.len();
    if m == 0 || n == 0 {
        return 0;
    }

    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp[m][n]
}

/// Case-insensitive exact name equality, ignoring surrounding whitespace.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn misspelling_scores_high() {
        let ratio = fuzzy_ratio("Payment", "Paiment");
        assert!((ratio - 12.0 / 14.0).abs() < 1e-9);
    }

    #[test]
    fn case_and_whitespace_are_ignored() {
        assert_eq!(fuzzy_ratio("  Chat ", "chat"), 1.0);
        assert!(names_equal(" User Profile", "user profile "));
    }

    #[test]
    fn empty_strings() {
        assert_eq!(fuzzy_ratio("", ""), 1.0);
        assert_eq!(fuzzy_ratio("abc", ""), 0.0);
    }

    #[test]
    fn unrelated_strings_score_low() {
        assert!(fuzzy_ratio("Authentication", "Chat") < 0.5);
    }

    proptest! {
        #[test]
        fn ratio_is_reflexive(s in "\\PC{0,24}") {
            prop_assert_eq!(fuzzy_ratio(&s, &s), 1.0);
        }

        #[test]
        fn ratio_is_symmetric_and_bounded(a in "[a-zA-Z ]{0,20}", b in "[a-zA-Z ]{0,20}") {
            let ab = fuzzy_ratio(&a, &b);
            prop_assert_eq!(ab, fuzzy_ratio(&b, &a));
            prop_assert!((0.0..=1.0).contains(&ab));
        }
    }
}
