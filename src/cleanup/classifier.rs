use super::rules::{CompiledRule, RuleAction};

/// Decision for one line inside a resource block
#[derive(Debug, Clone, PartialEq)]
pub enum LineAction {
    /// Pass the line through unchanged
    Keep,
    /// A keep rule matched, so delete rules were not consulted
    KeepOverride,
    /// Drop the line
    Delete,
    /// Replace the line with fixed text
    Replace {
        line: String,
        warning: Option<String>,
    },
}

/// Applies the rules of a single resource type to individual lines
///
/// Precedence is keep, then the first matching substitute, then delete
/// (tested against the substituted text).
pub struct LineClassifier<'a> {
    rules: &'a [CompiledRule],
}

impl<'a> LineClassifier<'a> {
    pub fn new(rules: &'a [CompiledRule]) -> Self {
        Self { rules }
    }

    /// Classify a line given without its line terminator
    pub fn classify(&self, line: &str) -> LineAction {
        if self.rules.is_empty() {
            return LineAction::Keep;
        }

        let keep = self
            .rules
            .iter()
            .any(|rule| rule.action == RuleAction::Keep && rule.pattern.is_match(line));

        if keep {
            return LineAction::KeepOverride;
        }

        let substitution = self.rules.iter().find_map(|rule| match &rule.action {
            RuleAction::Substitute {
                replacement,
                warning,
            } if rule.pattern.is_match(line) => Some((replacement, warning)),
            _ => None,
        });

        let candidate = substitution
            .map(|(replacement, _)| replacement.as_str())
            .unwrap_or(line);

        let delete = self
            .rules
            .iter()
            .any(|rule| rule.action == RuleAction::Delete && rule.pattern.is_match(candidate));

        if delete {
            return LineAction::Delete;
        }

        match substitution {
            Some((replacement, warning)) => LineAction::Replace {
                line: replacement.clone(),
                warning: warning.clone(),
            },
            None => LineAction::Keep,
        }
    }
}
