//! Keyword matching on resolved hostnames.
use std::str::FromStr;

/// The case-sensitive substrings a hostname is checked against.
///
/// Matching is plain containment, not token or domain-label aware, so `ms`
/// matches `mstream.example.com.` too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keywords(Vec<String>);

impl Keywords {
    /// Builds the set, discarding empty keywords since they would match everything.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            words
                .into_iter()
                .map(Into::into)
                .filter(|word| !word.is_empty())
                .collect(),
        )
    }

    /// True if `hostname` contains any keyword. An empty set never matches.
    ///
    /// ```rust
    /// # use sand_devil::keywords::Keywords;
    /// let keywords: Keywords = "microsoft,ms,office,azure".parse().unwrap();
    /// assert!(keywords.matches("mailforcepoint1new.centralindia.cloudapp.azure.com."));
    /// assert!(!keywords.matches("example.com."));
    /// ```
    #[must_use]
    pub fn matches(&self, hostname: &str) -> bool {
        self.0.iter().any(|word| hostname.contains(word.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromStr for Keywords {
    type Err = std::convert::Infallible;

    /// Splits a comma-separated list. Words are kept verbatim, spaces included.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.split(',')))
    }
}

#[cfg(test)]
mod tests {
    use super::Keywords;
    use parameterized::parameterized;

    fn keywords(list: &str) -> Keywords {
        list.parse().unwrap()
    }

    #[parameterized(hostname = {
        "mailforcepoint1new.centralindia.cloudapp.azure.com.",
        "mscreen.cariflex.com.",
        "smtp.hourlyrooms.co.in.",
        "az-20-194-193-167.japaneast.cloudapp.azure.com.",
    }, expected = {
        true, true, true, true,
    })]
    fn substring_anywhere_matches(hostname: &str, expected: bool) {
        assert_eq!(keywords("microsoft,ms,office,azure").matches(hostname), expected);
    }

    #[test]
    fn unrelated_host_does_not_match() {
        assert!(!keywords("microsoft,azure").matches("example.com."));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!keywords("Azure").matches("web.cloudapp.azure.com."));
        assert!(keywords("Azure").matches("Azure-ptr.example.net."));
    }

    #[test]
    fn empty_set_never_matches() {
        let empty = Keywords::default();
        assert!(empty.is_empty());
        assert!(!empty.matches("anything.example.com."));
        assert!(!empty.matches(""));
    }

    #[test]
    fn empty_segments_are_dropped() {
        let parsed = keywords("host1,,mail,");
        assert_eq!(parsed.iter().collect::<Vec<_>>(), ["host1", "mail"]);
        assert!(!parsed.matches("example.com."));
        assert!(keywords("").is_empty());
    }
}
