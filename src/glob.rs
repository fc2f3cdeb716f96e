//! Glob pattern matching over keys
//!
//! Wraps the `glob` crate's `Pattern` with brace alternation (`{a,b}`),
//! which it does not support natively: a pattern containing braces is
//! expanded into one `Pattern` per alternative and a key matches if any
//! of them does.

use crate::error::{Result, StoreError};

/// A compiled key-matching pattern.
pub struct KeyPattern {
    alternatives: Vec<glob::Pattern>,
}

impl KeyPattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let alternatives = expand_braces(pattern)
            .into_iter()
            .map(|p| glob::Pattern::new(&p))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| StoreError::InvalidPattern(e.to_string()))?;

        if alternatives.is_empty() {
            return Err(StoreError::InvalidPattern(pattern.to_string()));
        }

        Ok(Self { alternatives })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.alternatives.iter().any(|p| p.matches(key))
    }
}

/// Expands the first `{a,b,c}` group found into one string per
/// alternative, recursively expanding any further groups. A pattern
/// with no brace group expands to itself.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(close_rel) = pattern[open..].find('}') else {
        return vec![pattern.to_string()];
    };
    let close = open + close_rel;

    let prefix = &pattern[..open];
    let body = &pattern[open + 1..close];
    let suffix = &pattern[close + 1..];

    body.split(',')
        .flat_map(|alt| {
            let combined = format!("{prefix}{alt}{suffix}");
            expand_braces(&combined)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_literal_and_wildcards() {
        let p = KeyPattern::compile("Test*eys").unwrap();
        assert!(p.matches("TestKeys"));
        assert!(!p.matches("Other"));
    }

    #[test]
    fn matches_question_mark_and_class() {
        let p = KeyPattern::compile("key[0-9]?").unwrap();
        assert!(p.matches("key1a"));
        assert!(!p.matches("keyaa"));
    }

    #[test]
    fn expands_brace_alternation() {
        let p = KeyPattern::compile("user:{alice,bob}").unwrap();
        assert!(p.matches("user:alice"));
        assert!(p.matches("user:bob"));
        assert!(!p.matches("user:carol"));
    }

    #[test]
    fn rejects_invalid_pattern() {
        assert!(KeyPattern::compile("[").is_err());
    }
}
