//! Page classification by location substring.

/// The three page types this crate augments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageKind {
    /// The learn page (gets a toggle control above its review form).
    Learn,
    /// The settings page (gets a toggle control inside its form).
    Settings,
    /// The review page (gets the silent fold-on-load behavior).
    Review,
}

impl PageKind {
    /// Stable name for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            PageKind::Learn => "learn",
            PageKind::Settings => "settings",
            PageKind::Review => "review",
        }
    }
}

/// Classify a location string by substring match.
///
/// The priority order `/learn`, `/settings`, `/review` is part of the
/// contract: the first matching substring wins even when a location could
/// match more than one. No match means no page handler runs.
pub fn classify(location: &str) -> Option<PageKind> {
    if location.contains("/learn") {
        Some(PageKind::Learn)
    } else if location.contains("/settings") {
        Some(PageKind::Settings)
    } else if location.contains("/review") {
        Some(PageKind::Review)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_each_page() {
        assert_eq!(classify("https://jpdb.io/learn"), Some(PageKind::Learn));
        assert_eq!(classify("https://jpdb.io/settings"), Some(PageKind::Settings));
        assert_eq!(classify("https://jpdb.io/review#a"), Some(PageKind::Review));
        assert_eq!(classify("https://jpdb.io/stats"), None);
    }

    #[test]
    fn test_classify_priority_order() {
        // A path matching two substrings resolves by fixed priority.
        assert_eq!(classify("/review/learn"), Some(PageKind::Learn));
        assert_eq!(classify("/settings/review"), Some(PageKind::Settings));
    }

    #[test]
    fn test_classify_matches_anywhere_in_location() {
        assert_eq!(
            classify("https://jpdb.io/review?c=vf&r=1"),
            Some(PageKind::Review)
        );
    }
}
