use crate::executor::{DefaultExecutorRegistry, ExecutorRegistry};
use crate::traits::{
    CommandExecutor, FileSystem, Output, RealCommandExecutor, RealFileSystem, TerminalOutput,
};
use std::sync::Arc;

/// Application context that holds all dependencies for dependency injection
pub struct Context {
    pub fs: Arc<dyn FileSystem>,
    pub output: Arc<dyn Output>,
    pub executor_registry: Arc<dyn ExecutorRegistry>,
}

impl Context {
    /// Create a new context with real implementations (for production use)
    pub fn new() -> Self {
        let command: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor::new());
        Self {
            fs: Arc::new(RealFileSystem),
            output: Arc::new(TerminalOutput),
            executor_registry: Arc::new(DefaultExecutorRegistry::with_defaults(command)),
        }
    }

    /// Create a test context with specific mock implementations
    ///
    /// The executor registry runs its commands through `command`.
    #[cfg(test)]
    pub fn test_with(
        fs: Arc<dyn FileSystem>,
        output: Arc<dyn Output>,
        command: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            fs,
            output,
            executor_registry: Arc::new(DefaultExecutorRegistry::with_defaults(command)),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Self {
            fs: Arc::clone(&self.fs),
            output: Arc::clone(&self.output),
            executor_registry: Arc::clone(&self.executor_registry),
        }
    }
}
