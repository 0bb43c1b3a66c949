//! URL-safe slugs derived from category names.
//!
//! Slugs are not reversible and distinct names may collide; lookup by slug
//! resolves to the first match in snapshot order, and a miss means
//! "category not found" (the consumer redirects away).

/// Derive a URL-safe identifier from a human-readable name.
///
/// Lower-cases, trims, collapses whitespace runs to a single hyphen, and
/// strips every character outside `[a-z0-9-]`.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let hyphenated = lowered.split_whitespace().collect::<Vec<_>>().join("-");
    hyphenated
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation() {
        assert_eq!(slugify("Grocery List!!"), "grocery-list");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(slugify("  Multi   Space  "), "multi-space");
    }

    #[test]
    fn deterministic_for_identical_names() {
        assert_eq!(slugify("Weekend Plans"), slugify("Weekend Plans"));
    }

    #[test]
    fn output_alphabet_is_restricted() {
        let slug = slugify("Café & Bücher #2");
        assert!(slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert_eq!(slug, "caf--bcher-2");
    }

    #[test]
    fn distinct_names_may_collide() {
        assert_eq!(slugify("Work!"), slugify("Work?"));
    }

    #[test]
    fn empty_and_symbol_only_names_yield_empty_slug() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }
}
