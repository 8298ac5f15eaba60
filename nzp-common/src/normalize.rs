//! Case and punctuation insensitive string normalization
//!
//! Used for both search-text matching and genre equality.

/// Characters folded to whitespace before matching
const FOLDED: [char; 6] = ['-', ':', '(', ')', '*', ','];

/// Apostrophes are dropped outright so "Ocean's" matches "oceans"
const DROPPED: [char; 2] = ['\'', '\u{2019}'];

/// Normalize a string for matching
///
/// Lower-cases, drops apostrophes, replaces the fixed punctuation set with a
/// space, collapses whitespace runs to a single space and trims both ends.
///
/// # Examples
/// ```
/// use nzp_common::normalize;
///
/// assert_eq!(normalize("The Matrix: Reloaded"), normalize("the matrix reloaded"));
/// assert_eq!(normalize("  Spider-Man (2002) "), "spider man 2002");
/// ```
pub fn normalize(s: &str) -> String {
    let folded: String = s
        .chars()
        .filter(|c| !DROPPED.contains(c))
        .map(|c| if FOLDED.contains(&c) { ' ' } else { c })
        .flat_map(char::to_lowercase)
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize an optional value; a missing value normalizes to the empty string
pub fn normalize_opt(s: Option<&str>) -> String {
    s.map(normalize).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_and_case_insensitive() {
        assert_eq!(
            normalize("The Matrix: Reloaded"),
            normalize("the matrix reloaded")
        );
        assert_eq!(normalize("Ocean's Eleven"), "oceans eleven");
        assert_eq!(normalize("Ocean’s Eleven"), "oceans eleven");
        assert_eq!(normalize("*Sci-Fi, Action*"), "sci fi action");
    }

    #[test]
    fn test_whitespace_collapsed_and_trimmed() {
        assert_eq!(normalize("  a \t\n b   c  "), "a b c");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" - : () "), "");
    }

    #[test]
    fn test_idempotent() {
        for s in [
            "The Matrix: Reloaded",
            "  Spider-Man (2002) ",
            "ÉCOLE d'été",
            "a--b::c",
            "",
        ] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_missing_value_is_empty() {
        assert_eq!(normalize_opt(None), "");
        assert_eq!(normalize_opt(Some("Drama")), "drama");
    }
}
