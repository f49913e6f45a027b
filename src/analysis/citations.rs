//! Page references inside generated answers.
//!
//! The QA backend usually leads its answer with the most relevant citation
//! ("... see page 12 ..."). Only the first mention counts.

use regex::Regex;
use std::sync::OnceLock;

fn page_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // ASCII digits only; `\d` would also accept other Unicode digit classes.
        Regex::new(r"(?i)page\s+([0-9]+)").expect("page reference pattern is valid")
    })
}

/// Extract the first "page N" reference from an answer.
///
/// Returns `None` when the answer has no reference or the number does not
/// fit in a `u32`. No check is made against the document's page count.
pub fn extract_page_reference(answer: &str) -> Option<u32> {
    let captures = page_pattern().captures(answer)?;
    captures.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_case_reference() {
        assert_eq!(extract_page_reference("See Page 12 for details"), Some(12));
        assert_eq!(extract_page_reference("PAGE 4 lists the rent roll"), Some(4));
    }

    #[test]
    fn test_multiple_spaces() {
        assert_eq!(extract_page_reference("page   7"), Some(7));
        assert_eq!(extract_page_reference("on page\n\t9."), Some(9));
    }

    #[test]
    fn test_no_reference() {
        assert_eq!(extract_page_reference("no reference here"), None);
        assert_eq!(extract_page_reference("page twelve"), None);
        assert_eq!(extract_page_reference("page12"), None);
        assert_eq!(extract_page_reference(""), None);
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(extract_page_reference("Page 3 and also Page 9"), Some(3));
    }

    #[test]
    fn test_skips_non_matching_mentions() {
        assert_eq!(
            extract_page_reference("The cover page shows the asset; NOI is on page 5."),
            Some(5)
        );
    }

    #[test]
    fn test_leading_zeros_and_overflow() {
        assert_eq!(extract_page_reference("page 007"), Some(7));
        assert_eq!(extract_page_reference("page 99999999999999999999"), None);
    }

    #[test]
    fn test_unicode_digits_ignored() {
        assert_eq!(extract_page_reference("page ٣"), None);
    }
}
