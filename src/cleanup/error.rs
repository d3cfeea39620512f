use std::fmt;
use std::path::PathBuf;

/// Error types for the generated-configuration cleanup engine
#[derive(Debug)]
pub enum CleanupError {
    /// A rule pattern failed to compile
    Pattern { pattern: String, message: String },

    /// The rule table document could not be parsed
    RuleTable(String),

    /// Reading or rewriting the target file failed
    FileSystem { path: PathBuf, message: String },
}

impl fmt::Display for CleanupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupError::Pattern { pattern, message } => {
                write!(f, "Invalid cleanup pattern '{}': {}", pattern, message)
            }
            CleanupError::RuleTable(msg) => {
                write!(f, "Failed to parse cleanup rule table: {}", msg)
            }
            CleanupError::FileSystem { path, message } => {
                write!(f, "File system error on {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for CleanupError {}

impl From<serde_yaml::Error> for CleanupError {
    fn from(err: serde_yaml::Error) -> Self {
        CleanupError::RuleTable(err.to_string())
    }
}

impl CleanupError {
    /// Wrap a regex compilation failure together with the offending source pattern
    pub fn pattern(pattern: &str, err: regex::Error) -> Self {
        CleanupError::Pattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for cleanup operations
pub type CleanupResult<T> = Result<T, CleanupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_display() {
        let err = CleanupError::Pattern {
            pattern: "= [".to_string(),
            message: "unclosed character class".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Invalid cleanup pattern '= [': unclosed character class"
        );
    }

    #[test]
    fn test_filesystem_error_mentions_path() {
        let err = CleanupError::FileSystem {
            path: PathBuf::from("/tmp/generated.tf"),
            message: "permission denied".to_string(),
        };

        assert!(err.to_string().contains("/tmp/generated.tf"));
    }
}
