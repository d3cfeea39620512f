use regex::Regex;
use tracing::debug;

/// Deletes whole-file pattern matches that span several lines
pub struct MultilineEraser<'a> {
    patterns: &'a [Regex],
}

impl<'a> MultilineEraser<'a> {
    pub fn new(patterns: &'a [Regex]) -> Self {
        Self { patterns }
    }

    /// Returns the erased content and the number of removed spans
    pub fn erase(&self, content: &str) -> (String, usize) {
        let mut content = content.to_string();
        let mut removed = 0;

        for pattern in self.patterns {
            let matches = pattern.find_iter(&content).count();

            if matches == 0 {
                continue;
            }

            debug!(pattern = pattern.as_str(), matches, "Erasing multiline matches");
            removed += matches;
            content = pattern.replace_all(&content, "").into_owned();
        }

        (content, removed)
    }
}
