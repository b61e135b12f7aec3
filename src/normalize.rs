// Text normalization and the comparison predicates used by classification
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Canonical comparison form: hyphens and commas dropped, whitespace runs
/// collapsed, trimmed, lower-cased. Never used for display.
pub fn normalize_text(text: &str) -> String {
    let stripped = text.replace(['-', ','], "");
    WHITESPACE
        .replace_all(&stripped, " ")
        .trim()
        .to_lowercase()
}

/// Normalized text split into words
pub fn normalized_words(text: &str) -> Vec<String> {
    normalize_text(text)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// True if every element of `small` appears in `big` in the same relative
/// order, not necessarily contiguously.
pub fn is_subsequence<S: AsRef<str>>(small: &[S], big: &[S]) -> bool {
    let mut remaining = big.iter();
    small
        .iter()
        .all(|word| remaining.any(|candidate| candidate.as_ref() == word.as_ref()))
}

/// Words of `prefix` form a subsequence of the words of `description`
pub fn prefix_in_description(prefix: &str, description: &str) -> bool {
    is_subsequence(&normalized_words(prefix), &normalized_words(description))
}

/// Row text equals the term after normalization
pub fn is_exact_description(normalized_term: &str, description: &str) -> bool {
    normalize_text(description) == normalized_term
}

/// Row text contains the term as a substring without being equal to it
pub fn contains_description(normalized_term: &str, description: &str) -> bool {
    let normalized = normalize_text(description);
    normalized != normalized_term && normalized.contains(normalized_term)
}

/// Registry notes flag the description as deleted
pub fn notes_mark_deleted(notes: Option<&str>) -> bool {
    notes.is_some_and(|n| normalize_text(n).contains("deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Running-Shoes,  for\tMen \n"), "runningshoes for men");
        assert_eq!(normalize_text("T-shirts, polo"), "tshirts polo");
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \t\n"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Red  running -- shoes",
            "  ,,  ",
            "Bags, namely, HANDBAGS\u{00a0}and purses",
            "already normal",
            "Ünïcode\tWORDS",
        ];
        for sample in samples {
            let once = normalize_text(sample);
            assert_eq!(normalize_text(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_is_subsequence() {
        let big = ["red", "athletic", "running", "shoes"];
        assert!(is_subsequence(&["red", "running"], &big));
        assert!(is_subsequence(&["red", "athletic", "running", "shoes"], &big));
        assert!(is_subsequence::<&str>(&[], &big));
        assert!(!is_subsequence(&["running", "red"], &big));
        assert!(!is_subsequence(&["red", "shoes", "running"], &big));
        assert!(!is_subsequence(&["red", "red"], &big));
        assert!(!is_subsequence(&["red", "athletic", "running", "shoes", "x"], &big));
    }

    #[test]
    fn test_description_predicates() {
        let term = normalize_text("Running Shoes");
        assert!(is_exact_description(&term, "Running, Shoes"));
        assert!(is_exact_description(&term, "  RUNNING   shoes "));
        assert!(!contains_description(&term, "running shoes"));
        assert!(contains_description(&term, "Athletic running shoes for men"));
        assert!(!contains_description(&term, "shoes for running"));
        assert!(prefix_in_description("red running", "Red, athletic running shoes"));
    }

    #[test]
    fn test_notes_mark_deleted() {
        assert!(notes_mark_deleted(Some("Deleted 2020")));
        assert!(notes_mark_deleted(Some("entry DELETED-per examiner")));
        assert!(!notes_mark_deleted(Some("Modified 2019")));
        assert!(!notes_mark_deleted(None));
    }
}
