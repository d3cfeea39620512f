use std::fmt;
use std::path::PathBuf;

use crate::cleanup::CleanupError;

/// Error types for infrastructure import operations
#[derive(Debug)]
pub enum ImportError {
    /// Terraform/OpenTofu command failed
    ExecutorFailed {
        command: String,
        message: String,
        exit_code: Option<i32>,
    },

    /// The generate-config plan did not produce the expected file
    MissingGeneratedFile(PathBuf),

    /// Configuration or inventory file parsing error
    ConfigParse(String),

    /// Invalid resource type for provider
    UnsupportedResourceType {
        provider: String,
        resource_type: String,
    },

    /// The subscription is configured to never import this kind
    SkippedBySettings {
        subscription: String,
        resource_kind: String,
    },

    /// Import block rendering failed
    Template(String),

    /// Generated configuration could not be cleaned
    Cleanup(CleanupError),

    /// File system operation failed
    FileSystem(String),

    /// Invalid input or parameter
    InvalidInput(String),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::ExecutorFailed {
                command,
                message,
                exit_code,
            } => {
                write!(f, "Executor command '{}' failed", command)?;

                if let Some(code) = exit_code {
                    write!(f, " (exit code {})", code)?;
                }

                write!(f, ": {}", message)
            }
            ImportError::MissingGeneratedFile(path) => {
                write!(
                    f,
                    "Generated configuration was not written: {}",
                    path.display()
                )
            }
            ImportError::ConfigParse(msg) => {
                write!(f, "Failed to parse configuration: {}", msg)
            }
            ImportError::UnsupportedResourceType {
                provider,
                resource_type,
            } => {
                write!(
                    f,
                    "Unsupported resource type '{}' for provider '{}'",
                    resource_type, provider
                )
            }
            ImportError::SkippedBySettings {
                subscription,
                resource_kind,
            } => {
                write!(
                    f,
                    "Importing '{}' is disabled for subscription '{}' in skip_resources",
                    resource_kind, subscription
                )
            }
            ImportError::Template(msg) => {
                write!(f, "Template rendering failed: {}", msg)
            }
            ImportError::Cleanup(err) => {
                write!(f, "Cleanup failed: {}", err)
            }
            ImportError::FileSystem(msg) => {
                write!(f, "File system error: {}", msg)
            }
            ImportError::InvalidInput(msg) => {
                write!(f, "Invalid input: {}", msg)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Cleanup(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CleanupError> for ImportError {
    fn from(err: CleanupError) -> Self {
        ImportError::Cleanup(err)
    }
}

impl From<serde_yaml::Error> for ImportError {
    fn from(err: serde_yaml::Error) -> Self {
        ImportError::ConfigParse(err.to_string())
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::ConfigParse(err.to_string())
    }
}

impl From<handlebars::RenderError> for ImportError {
    fn from(err: handlebars::RenderError) -> Self {
        ImportError::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for ImportError {
    fn from(err: handlebars::TemplateError) -> Self {
        ImportError::Template(err.to_string())
    }
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;
