//! Auxiliary parameter extraction from query text
//!
//! Extraction is separate from the rule-group predicates so each side is
//! independently testable. Every extractor is best-effort: failure to
//! extract leaves the corresponding payload field absent, it is never an
//! error.

use regex::Regex;
use std::sync::LazyLock;

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("Invalid regex"));

static EXPLICIT_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:find|search\s+for|look\s*up|lookup)\s+(\p{Lu}[\p{L}'\-]+)")
        .expect("Invalid regex")
});

static CAPITALIZED_TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\p{Lu}[\p{L}'\-]+)\b").expect("Invalid regex"));

static DEPARTMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bin\s+(?:the\s+)?([\p{L}][\p{L}&/ ]*?)\s+department\b")
        .expect("Invalid regex")
});

static TEAM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([\p{L}][\p{L}&/]*)\s+team\b").expect("Invalid regex"));

static LIMIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btop\s+(\d{1,3})\b").expect("Invalid regex"));

static THRESHOLD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:below|under|less\s+than)\s+(\d+)\b").expect("Invalid regex")
});

/// First 4-digit year anywhere in the text
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Person name: explicit "find/search for NAME" first, then the first
/// capitalized token that is not the opening word of the text
pub fn extract_name(text: &str) -> Option<String> {
    if let Some(caps) = EXPLICIT_NAME_PATTERN.captures(text) {
        let candidate = caps.get(1).map(|m| m.as_str())?;
        if !is_common_capitalized(candidate) {
            return Some(candidate.to_string());
        }
    }

    for m in CAPITALIZED_TOKEN_PATTERN.find_iter(text) {
        // The opening word of a sentence is capitalized regardless of
        // being a name
        if m.start() == 0 {
            continue;
        }
        let candidate = m.as_str();
        if !is_common_capitalized(candidate) {
            return Some(candidate.to_string());
        }
    }

    None
}

/// Department phrase: "in X department" or "X team"
pub fn extract_department(text: &str) -> Option<String> {
    if let Some(caps) = DEPARTMENT_PATTERN.captures(text) {
        return caps.get(1).map(|m| m.as_str().trim().to_string());
    }
    if let Some(caps) = TEAM_PATTERN.captures(text) {
        return caps.get(1).map(|m| m.as_str().trim().to_string());
    }
    None
}

/// Numeric limit from "top N"
pub fn extract_limit(text: &str) -> Option<u32> {
    LIMIT_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Numeric threshold from "below N" / "under N"
pub fn extract_threshold(text: &str) -> Option<f64> {
    THRESHOLD_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Capitalized words that are clearly not person names
fn is_common_capitalized(word: &str) -> bool {
    matches!(
        word.to_lowercase().as_str(),
        "i" | "the"
            | "a"
            | "an"
            | "all"
            | "my"
            | "our"
            | "show"
            | "find"
            | "search"
            | "list"
            | "who"
            | "what"
            | "january"
            | "february"
            | "march"
            | "april"
            | "may"
            | "june"
            | "july"
            | "august"
            | "september"
            | "october"
            | "november"
            | "december"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("monthly sales for 2024"), Some(2024));
        assert_eq!(extract_year("revenue trend"), None);
        // A bare number that is not a plausible year
        assert_eq!(extract_year("top 5000 customers"), None);
    }

    #[test]
    fn test_extract_name_explicit() {
        assert_eq!(
            extract_name("find Kogut in Sales department"),
            Some("Kogut".to_string())
        );
        assert_eq!(
            extract_name("search for Nowak please"),
            Some("Nowak".to_string())
        );
    }

    #[test]
    fn test_extract_name_capitalized_token() {
        assert_eq!(
            extract_name("is Kowalski still employed"),
            Some("Kowalski".to_string())
        );
        // Opening word alone is not a name signal
        assert_eq!(extract_name("Employees in warehouse"), None);
    }

    #[test]
    fn test_extract_department() {
        assert_eq!(
            extract_department("find Kogut in Sales department"),
            Some("Sales".to_string())
        );
        assert_eq!(
            extract_department("who is on the marketing team"),
            Some("marketing".to_string())
        );
        assert_eq!(extract_department("monthly sales"), None);
    }

    #[test]
    fn test_extract_limit() {
        assert_eq!(extract_limit("top 5 customers"), Some(5));
        assert_eq!(extract_limit("best customers"), None);
    }

    #[test]
    fn test_extract_threshold() {
        assert_eq!(extract_threshold("products below 15 in stock"), Some(15.0));
        assert_eq!(extract_threshold("low stock products"), None);
    }

    #[test]
    fn test_extract_name_diacritics() {
        assert_eq!(
            extract_name("find Żółć in the warehouse"),
            Some("Żółć".to_string())
        );
    }
}
