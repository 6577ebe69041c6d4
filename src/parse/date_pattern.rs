use regex::Regex;

use crate::model::journal::DATE_KEY_LEN;

/// Error type for date pattern expansion
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("date pattern is empty")]
    Empty,
    #[error("invalid date pattern \"{0}\": expected YYYY-MM-DD with `*` wildcards (e.g. 2024-*-15)")]
    Malformed(String),
    #[error("could not compile date pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Anchored matcher for `YYYY-MM-DD` date keys with `*` wildcards.
///
/// Up to three `-` separated parts. A part that is exactly `*` matches any
/// 4-digit year or 2-digit month/day. Everything else is literal, so `1*`
/// only matches the text `1*`.
#[derive(Debug, Clone)]
pub struct DateMatcher {
    pattern: String,
    regex: Regex,
}

impl DateMatcher {
    pub fn expand(pattern: &str) -> Result<Self, PatternError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        let parts: Vec<&str> = pattern.split('-').collect();
        let well_formed = parts.len() <= 3
            && parts
                .iter()
                .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit() || c == '*'));
        if !well_formed {
            return Err(PatternError::Malformed(pattern.to_string()));
        }

        let expanded: Vec<String> = parts
            .iter()
            .enumerate()
            .map(|(i, part)| match (i, *part) {
                (0, "*") => r"\d{4}".to_string(),
                (_, "*") => r"\d{2}".to_string(),
                (_, literal) => regex::escape(literal),
            })
            .collect();

        let regex = Regex::new(&format!("^{}$", expanded.join("-")))?;
        Ok(DateMatcher {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Test the first 10 characters of a date key.
    pub fn is_match(&self, date_key: &str) -> bool {
        let head = date_key.get(..DATE_KEY_LEN).unwrap_or(date_key);
        self.regex.is_match(head)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The anchored regular expression this pattern expanded to
    pub fn as_regex(&self) -> &str {
        self.regex.as_str()
    }
}
