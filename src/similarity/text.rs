//! Word-overlap scoring shared by the text-based scorers.
//!
//! Text is lowercased and split into `\w+` runs (Unicode word characters).
//! The score is the size of the shared word set divided by the size of the
//! larger set, so a short document fully contained in a long one still
//! scores low.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    // Constant pattern, checked by the tests below.
    WORD.get_or_init(|| Regex::new(r"\w+").expect("word pattern compiles"))
}

/// Distinct lowercased words of `text`.
///
/// # Examples
///
/// ```
/// use dupewise::similarity::tokenize;
///
/// let words = tokenize("The cat, the HAT.");
/// assert_eq!(words.len(), 3);
/// assert!(words.contains("hat"));
/// ```
#[must_use]
pub fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    word_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Overlap of two word sets: `|a ∩ b| / max(|a|, |b|)`.
///
/// Returns 0.0 when either set is empty.
#[must_use]
pub fn set_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let shared = small.iter().filter(|w| large.contains(*w)).count();
    shared as f64 / large.len() as f64
}

/// Word overlap of two texts.
///
/// # Examples
///
/// ```
/// use dupewise::similarity::word_overlap;
///
/// assert_eq!(word_overlap("alpha beta", "beta alpha"), 1.0);
/// assert_eq!(word_overlap("alpha beta", "alpha gamma delta epsilon"), 0.25);
/// assert_eq!(word_overlap("", "alpha"), 0.0);
/// ```
#[must_use]
pub fn word_overlap(a: &str, b: &str) -> f64 {
    set_overlap(&tokenize(a), &tokenize(b))
}
