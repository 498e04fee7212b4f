//! Subject pattern validation.
//!
//! Subjects are `.`-separated tokens. `*` matches a single token and `>`
//! matches one or more trailing tokens, so `>` may only appear as the last
//! token of a pattern.

/// Host capability deciding whether a subject pattern is syntactically valid.
pub trait SubjectValidator: Send + Sync {
    fn is_valid_subject(&self, subject: &str) -> bool;
}

/// Token separator.
const TOKEN_SEPARATOR: char = '.';

/// Full wildcard token.
const FULL_WILDCARD: &str = ">";

/// Validator for the broker's default subject grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct NatsSubjectValidator;

impl SubjectValidator for NatsSubjectValidator {
    fn is_valid_subject(&self, subject: &str) -> bool {
        if subject.is_empty() || subject.chars().any(char::is_whitespace) {
            return false;
        }

        let mut after_full_wildcard = false;
        for token in subject.split(TOKEN_SEPARATOR) {
            if token.is_empty() || after_full_wildcard {
                return false;
            }
            if token == FULL_WILDCARD {
                after_full_wildcard = true;
            }
        }
        true
    }
}

impl<F> SubjectValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid_subject(&self, subject: &str) -> bool {
        self(subject)
    }
}
