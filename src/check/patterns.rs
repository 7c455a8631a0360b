//! Custom regex pattern checks.
//!
//! Patterns run against the whole source text, so the same code serves both
//! the tree-based and the textual checker.

use regex::RegexBuilder;

use crate::rules::CustomPattern;

use super::MissingPattern;

/// Longest matched text quoted for a negative pattern.
const MATCH_QUOTE_LEN: usize = 80;

/// Evaluate custom patterns and return the ones that failed.
///
/// Informational patterns (`required: false`) are compiled and run but never
/// reported. A pattern that does not compile is reported instead of aborting
/// the remaining checks.
pub fn check_custom_patterns(source: &str, patterns: &[CustomPattern]) -> Vec<MissingPattern> {
    let mut missing = Vec::new();

    for p in patterns {
        let regex = match RegexBuilder::new(&p.pattern)
            .dot_matches_new_line(true)
            .build()
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(pattern = %p.pattern, error = %e, "invalid custom pattern");
                missing.push(MissingPattern {
                    description: p.description.clone(),
                    error_message: format!("invalid pattern {:?}: {}", p.pattern, e),
                    matched_text: None,
                });
                continue;
            }
        };

        let found = regex.find(source);
        if !p.required {
            continue;
        }

        match (p.negative, found) {
            (false, None) => missing.push(MissingPattern {
                description: p.description.clone(),
                error_message: message_or(&p.error_message, || {
                    format!("required pattern not found: {}", describe(p))
                }),
                matched_text: None,
            }),
            (true, Some(m)) => missing.push(MissingPattern {
                description: p.description.clone(),
                error_message: message_or(&p.error_message, || {
                    format!("forbidden pattern present: {}", describe(p))
                }),
                matched_text: Some(m.as_str().chars().take(MATCH_QUOTE_LEN).collect()),
            }),
            _ => {}
        }
    }

    missing
}

fn describe(p: &CustomPattern) -> &str {
    if p.description.is_empty() {
        &p.pattern
    } else {
        &p.description
    }
}

fn message_or(message: &str, fallback: impl FnOnce() -> String) -> String {
    if message.is_empty() {
        fallback()
    } else {
        message.to_string()
    }
}
