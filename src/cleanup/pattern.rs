//! Line patterns used by the cleanup rule table.
//!
//! In YAML a plain string is a literal substring match and a `{ regex: ... }`
//! mapping is a regular expression searched anywhere in the line.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::error::{CleanupError, CleanupResult};

/// Uncompiled pattern as written in a rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternSpec {
    Literal(String),
    Regex { regex: String },
}

impl PatternSpec {
    pub fn literal(text: impl Into<String>) -> Self {
        PatternSpec::Literal(text.into())
    }

    pub fn regex(expr: impl Into<String>) -> Self {
        PatternSpec::Regex { regex: expr.into() }
    }

    /// The pattern text as written
    pub fn source(&self) -> &str {
        match self {
            PatternSpec::Literal(text) => text,
            PatternSpec::Regex { regex } => regex,
        }
    }

    pub fn compile(&self) -> CleanupResult<Pattern> {
        match self {
            PatternSpec::Literal(text) => Ok(Pattern::Literal(text.clone())),
            PatternSpec::Regex { regex } => Regex::new(regex)
                .map(Pattern::Regex)
                .map_err(|e| CleanupError::pattern(regex, e)),
        }
    }
}

/// Compiled single-line pattern
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Pattern::Literal(text) => line.contains(text.as_str()),
            Pattern::Regex(regex) => regex.is_match(line),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Literal(text) => text,
            Pattern::Regex(regex) => regex.as_str(),
        }
    }
}

/// Compile a whole-file pattern where `^`/`$` match at line boundaries and `.` spans newlines
pub fn compile_multiline(expr: &str) -> CleanupResult<Regex> {
    RegexBuilder::new(expr)
        .multi_line(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| CleanupError::pattern(expr, e))
}
