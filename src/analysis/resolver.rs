//! Subject resolution from free text
//!
//! The resolver is a ranked cascade of heuristics; the first strategy that
//! produces a candidate wins:
//!
//! 1. A token ending in a known drug-name suffix (`-statin`, `-mab`, ...)
//! 2. The longest capitalized token that is not a stop word
//! 3. The capitalized word right after "of"
//!
//! It is a heuristic and will pick the wrong token on adversarial input.
//! Callers that know the subject should pass it explicitly.

use crate::types::{AppError, Result};
use std::collections::HashSet;

/// Suffixes of common drug-name stems
pub const DRUG_SUFFIXES: &[&str] = &[
    "mab", "nib", "ine", "cin", "zole", "pril", "sartan", "statin", "mycin", "cillin", "formin",
    "parin", "tinib",
];

/// Capitalized words that commonly start a question rather than name a molecule
pub const STOP_WORDS: &[&str] = &[
    "Evaluate",
    "Analysis",
    "Study",
    "Research",
    "Report",
    "Clinical",
    "The",
    "This",
    "That",
    "What",
    "Which",
    "Type",
    "Managing",
    "Diabetes",
    "Assess",
    "Efficacy",
    "Safety",
    "Profile",
    "Treatment",
    "Therapy",
    "Explain",
    "Discuss",
    "Describe",
    "Analyze",
    "Compare",
    "Review",
    "Investigate",
    "Explore",
    "Examine",
    "Detail",
    "Provide",
];

/// Tokens must be longer than this to be considered
const MIN_LEN_EXCLUSIVE: usize = 4;

#[derive(Debug, Clone)]
pub struct SubjectResolver {
    suffixes: Vec<String>,
    stop_words: HashSet<String>,
}

impl Default for SubjectResolver {
    fn default() -> Self {
        Self::new(
            DRUG_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            STOP_WORDS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Drop every non-word character from a whitespace token
fn clean_token(token: &str) -> String {
    token.chars().filter(|c| is_word_char(*c)).collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First letter upper case, the rest lower case
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

impl SubjectResolver {
    pub fn new(suffixes: Vec<String>, stop_words: HashSet<String>) -> Self {
        Self {
            suffixes: suffixes.into_iter().map(|s| s.to_lowercase()).collect(),
            stop_words,
        }
    }

    fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Run the cascade over `text`
    pub fn resolve(&self, text: &str) -> Option<String> {
        self.by_suffix(text)
            .or_else(|| self.by_capitalization(text))
            .or_else(|| self.after_of(text))
    }

    /// Use `explicit` when given, otherwise resolve from `query`
    pub fn resolve_subject(&self, explicit: Option<&str>, query: &str) -> Result<String> {
        if let Some(subject) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(subject.to_string());
        }

        match self.resolve(query) {
            Some(subject) => {
                tracing::debug!(query, subject = %subject, "Resolved molecule from query");
                Ok(subject)
            }
            None => Err(AppError::Resolution(format!(
                "no molecule name found in query '{}'; supply one explicitly",
                query.trim()
            ))),
        }
    }

    /// Strategy 1: first token ending in a known suffix
    pub fn by_suffix(&self, text: &str) -> Option<String> {
        text.split_whitespace()
            .map(clean_token)
            .find(|word| {
                let lower = word.to_lowercase();
                char_len(word) > MIN_LEN_EXCLUSIVE
                    && self.suffixes.iter().any(|suffix| lower.ends_with(suffix.as_str()))
            })
            .map(|word| capitalize(&word))
    }

    /// Strategy 2: longest capitalized non-stop-word, first occurrence on ties
    pub fn by_capitalization(&self, text: &str) -> Option<String> {
        let mut best: Option<String> = None;

        for word in text.split_whitespace().map(clean_token) {
            let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
            if !starts_upper || char_len(&word) <= MIN_LEN_EXCLUSIVE || self.is_stop_word(&word) {
                continue;
            }
            let longer = best
                .as_ref()
                .is_none_or(|current| char_len(&word) > char_len(current));
            if longer {
                best = Some(word);
            }
        }

        best
    }

    /// Strategy 3: the first `of <Capitalized>` occurrence, if it qualifies
    pub fn after_of(&self, text: &str) -> Option<String> {
        let candidate = first_capitalized_after_of(text)?;
        if char_len(candidate) > MIN_LEN_EXCLUSIVE && !self.is_stop_word(candidate) {
            Some(candidate.to_string())
        } else {
            None
        }
    }
}

/// Leftmost word matching `\bof\s+([A-Z][a-z]+)`
fn first_capitalized_after_of(text: &str) -> Option<&str> {
    let mut prev: Option<char> = None;

    for (idx, c) in text.char_indices() {
        let at_boundary = prev.is_none_or(|p| !is_word_char(p));
        prev = Some(c);

        if !at_boundary || !text[idx..].starts_with("of") {
            continue;
        }

        let rest = &text[idx + 2..];
        let word_start = rest.trim_start();
        if word_start.len() == rest.len() {
            continue;
        }

        let mut chars = word_start.char_indices();
        if !matches!(chars.next(), Some((_, c)) if c.is_ascii_uppercase()) {
            continue;
        }
        let end = chars
            .find(|(_, c)| !c.is_ascii_lowercase())
            .map(|(i, _)| i)
            .unwrap_or(word_start.len());
        if end > 1 {
            return Some(&word_start[..end]);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Evaluate the efficacy of Atorvastatin in elderly patients", "Atorvastatin")]
    #[case("Metformin dosing guidelines", "Metformin")]
    #[case("pembrolizumab market outlook", "Pembrolizumab")]
    #[case("latest news on IMATINIB", "Imatinib")]
    #[case("Is Atorvastatin, or Lisinopril, better?", "Atorvastatin")]
    #[case("Market potential for Aspirin and Tylenol", "Aspirin")]
    #[case("Explain the Safety Profile of Paracetamol", "Paracetamol")]
    // "examine" ends in "ine"; the suffix rule wins over everything else
    #[case("Examine Ibuprofen demand", "Examine")]
    fn test_resolves(#[case] query: &str, #[case] expected: &str) {
        let resolver = SubjectResolver::default();
        assert_eq!(resolver.resolve(query).as_deref(), Some(expected));
    }

    #[rstest]
    #[case("what are the side effects")]
    #[case("Explain Safety Profile")]
    #[case("")]
    #[case("tell me about Ozym")]
    fn test_fails(#[case] query: &str) {
        assert!(SubjectResolver::default().resolve(query).is_none());
    }

    #[test]
    fn test_explicit_subject_wins() {
        let resolver = SubjectResolver::default();
        assert_eq!(
            resolver
                .resolve_subject(Some("  Aspirin "), "Metformin dosing")
                .unwrap(),
            "Aspirin"
        );
        assert_eq!(
            resolver.resolve_subject(Some(" "), "Metformin dosing").unwrap(),
            "Metformin"
        );
    }

    #[test]
    fn test_resolution_failure_is_an_error() {
        let err = SubjectResolver::default()
            .resolve_subject(None, "what are the side effects")
            .unwrap_err();
        assert!(matches!(err, AppError::Resolution(_)));
    }

    #[test]
    fn test_after_of() {
        let resolver = SubjectResolver::default();
        assert_eq!(resolver.after_of("review of Warfarin use").as_deref(), Some("Warfarin"));
        // Only the first match is considered
        assert!(resolver.after_of("use of Zinc and of Warfarin").is_none());
        // Stop words are rejected
        assert!(resolver.after_of("the role of Therapy").is_none());
        // "of" must start a word
        assert!(resolver.after_of("proof Warfarin").is_none());
        // At least one whitespace character is required
        assert!(resolver.after_of("ofWarfarin").is_none());
    }

    #[test]
    fn test_first_capitalized_after_of_is_ascii_only() {
        assert_eq!(first_capitalized_after_of("of  Heparinx9"), Some("Heparinx"));
        assert_eq!(first_capitalized_after_of("of É"), None);
        assert_eq!(first_capitalized_after_of("of X"), None);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("iMATINIB"), "Imatinib");
        assert_eq!(capitalize(""), "");
    }
}
