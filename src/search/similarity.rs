//! String similarity scores on a 0-100 scale.
//!
//! Both strategies normalise their inputs the same way before comparing:
//! non-ASCII characters are dropped, anything that is not an ASCII letter or
//! digit becomes a space, and the result is lower-cased and split on
//! whitespace. A side that normalises to nothing scores 0.

use std::collections::BTreeSet;
use std::fmt;

/// A similarity computation that could not produce a score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityError(pub String);

impl fmt::Display for SimilarityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "similarity backend failure: {}", self.0)
    }
}

impl std::error::Error for SimilarityError {}

/// The two scoring strategies club search relies on.
pub trait Similarity {
    /// Compares the strings after sorting their tokens alphabetically.
    fn token_sort_ratio(&self, a: &str, b: &str) -> Result<u8, SimilarityError>;

    /// Compares the strings as unordered token sets: the shared tokens
    /// against each side's shared-plus-leftover tokens.
    fn token_set_ratio(&self, a: &str, b: &str) -> Result<u8, SimilarityError>;
}

/// Scores from the characters two strings share in a minimal diff.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiffSimilarity;

impl Similarity for DiffSimilarity {
    fn token_sort_ratio(&self, a: &str, b: &str) -> Result<u8, SimilarityError> {
        let a = sorted_tokens(&normalize(a));
        let b = sorted_tokens(&normalize(b));
        Ok(ratio(&a, &b))
    }

    fn token_set_ratio(&self, a: &str, b: &str) -> Result<u8, SimilarityError> {
        let a = normalize(a);
        let b = normalize(b);
        if a.is_empty() || b.is_empty() {
            return Ok(0);
        }

        let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
        let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

        let shared = join(tokens_a.intersection(&tokens_b));
        let only_a = join(tokens_a.difference(&tokens_b));
        let only_b = join(tokens_b.difference(&tokens_a));

        let with_a = format!("{} {}", shared, only_a).trim().to_owned();
        let with_b = format!("{} {}", shared, only_b).trim().to_owned();

        Ok(ratio(&shared, &with_a)
            .max(ratio(&shared, &with_b))
            .max(ratio(&with_a, &with_b)))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .trim()
        .to_owned()
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join<'a>(tokens: impl Iterator<Item = &'a &'a str>) -> String {
    tokens.copied().collect::<Vec<&str>>().join(" ")
}

/// `2 * matched / (len(a) + len(b))` scaled to 0-100, where `matched` counts
/// the characters the two strings keep in common in a minimal diff.
fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let matched = common_subsequence_len(&a, &b);

    (200.0 * matched as f64 / (a.len() + b.len()) as f64).round() as u8
}

/// Length of the longest common subsequence, i.e. the equal characters of a
/// minimal insert/delete diff. Keeps a single row of the table.
fn common_subsequence_len(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diagonal = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_identical_and_disjoint() {
        assert_eq!(ratio("book club", "book club"), 100);
        assert_eq!(ratio("abc", "xyz"), 0);
        assert_eq!(ratio("", "abc"), 0);
    }

    #[test]
    fn test_common_subsequence_len() {
        let chars = |s: &str| s.chars().collect::<Vec<char>>();
        assert_eq!(common_subsequence_len(&chars("astrnmy"), &chars("astronomy")), 7);
        assert_eq!(common_subsequence_len(&chars("abc"), &chars("")), 0);
        assert_eq!(common_subsequence_len(&chars("abcbdab"), &chars("bdcaba")), 4);
    }

    #[test]
    fn test_ratio_counts_every_shared_character() {
        // Short equal runs between edits still count as matched.
        assert_eq!(ratio("astrnmy", "astronomy"), 88);
        assert_eq!(ratio("rbtcs", "robotics"), 77);
        assert_eq!(ratio("vlntr", "volunteer"), 71);
        assert_eq!(ratio("phlsphy", "philosophy"), 82);
    }

    #[test]
    fn test_dropped_vowels_clear_name_threshold() {
        let s = DiffSimilarity;
        for (query, name) in [
            ("rbtcs", "Robotics"),
            ("vlntr", "Volunteer"),
            ("phlsphy", "Philosophy"),
        ] {
            let score = s.token_sort_ratio(query, name).unwrap();
            assert!(score >= 55, "{} vs {} scored {}", query, name, score);
        }
    }

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  Chess & Go, Club! "), "chess   go  club");
        assert_eq!(normalize("Café"), "caf");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn test_token_sort_ignores_word_order() {
        let s = DiffSimilarity;
        assert_eq!(s.token_sort_ratio("club chess", "Chess Club").unwrap(), 100);
        // "bok club" vs "book club": 8 shared characters over 17.
        assert_eq!(s.token_sort_ratio("bok club", "Book Club").unwrap(), 94);
    }

    #[test]
    fn test_token_sort_empty_side_scores_zero() {
        let s = DiffSimilarity;
        assert_eq!(s.token_sort_ratio("", "Book Club").unwrap(), 0);
        assert_eq!(s.token_sort_ratio("???", "Book Club").unwrap(), 0);
    }

    #[test]
    fn test_token_set_subset_scores_full() {
        let s = DiffSimilarity;
        assert_eq!(
            s.token_set_ratio("hiking", "Weekend hiking and camping trips").unwrap(),
            100
        );
    }

    #[test]
    fn test_token_set_partial_overlap() {
        let s = DiffSimilarity;
        // Shared "club" against "club bok": 8 of 12 characters.
        assert_eq!(s.token_set_ratio("bok club", "A cooking club").unwrap(), 67);
        assert_eq!(s.token_set_ratio("bok club", "").unwrap(), 0);
    }
}
