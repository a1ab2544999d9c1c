//! String similarity used for fuzzy matching.
//!
//! Matching only needs one scoring function, so this is a trait with a
//! single in-crate implementation rather than a general similarity toolkit.

/// Scores how close two strings are, from 0 (unrelated) to 100 (identical).
pub trait Similarity {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Token-order-insensitive ratio: both inputs are split on whitespace, the
/// tokens sorted and re-joined, then compared with a normalized indel
/// similarity. "store msb" and "msb store" score 100.
///
/// Case is significant; callers lowercase first when they want otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortRatio;

impl Similarity for TokenSortRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        indel_ratio(&sorted_tokens(a), &sorted_tokens(b))
    }
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// `100 * (1 - indel_distance / (len_a + len_b))`, computed on chars.
/// Two empty strings are identical.
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let lcs = lcs_len(&a, &b);
    let distance = total - 2 * lcs;
    100.0 * (1.0 - distance as f64 / total as f64)
}

/// Longest common subsequence length, two-row dynamic programming.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
