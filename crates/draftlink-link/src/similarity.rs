//! Title normalisation and fuzzy similarity.
//!
//! The score is the Indel-normalised ratio `200 * LCS(a, b) / (|a| + |b|)`,
//! computed over chars and truncated to an integer. Truncation keeps
//! `score >= threshold` equivalent to comparing the unrounded ratio.

use std::sync::LazyLock;

use regex::Regex;

static NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+/\d+[.\s]+").expect("number prefix pattern"));

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern"));

/// Normalise a title for comparison.
///
/// "80/60. Oceans and the law of the sea" → "oceans and the law of the sea"
pub fn normalize_title(title: &str) -> String {
    let stripped = NUMBER_PREFIX.replace(title.trim_start(), "");
    let lower = stripped.to_lowercase();
    NON_ALNUM.replace_all(&lower, " ").trim().to_string()
}

/// Similarity of two strings in `0..=100`. Two empty strings score 100.
pub fn similarity(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let lcs = lcs_len(&a, &b);
    (200 * lcs / total) as u8
}

/// [`similarity`] over normalised titles.
pub fn title_similarity(a: &str, b: &str) -> u8 {
    similarity(&normalize_title(a), &normalize_title(b))
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];

    for &x in long {
        for (j, &y) in short.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}
