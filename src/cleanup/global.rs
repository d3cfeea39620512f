use tracing::debug;

use super::rules::GlobalRules;

/// Removes subscription-wide noise lines regardless of resource type
pub struct GlobalRedactor<'a> {
    rules: &'a GlobalRules,
}

impl<'a> GlobalRedactor<'a> {
    pub fn new(rules: &'a GlobalRules) -> Self {
        Self { rules }
    }

    /// Returns the redacted content and the number of removed lines
    pub fn redact(&self, content: &str) -> (String, usize) {
        let mut output = String::with_capacity(content.len());
        let mut removed = 0;

        for raw in content.split_inclusive('\n') {
            let line = raw.trim_end_matches(['\r', '\n']);

            if self.rules.is_noise(line) && !self.rules.is_exception(line) {
                debug!(line = line.trim(), "Removing global noise line");
                removed += 1;
                continue;
            }

            output.push_str(raw);
        }

        (output, removed)
    }
}
