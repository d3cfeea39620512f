use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Output};

/// Trait for executing system commands, allowing for mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments and return output
    fn execute(&self, command: &str, args: &[&str], working_dir: &Path) -> Result<Output>;
}

/// Real command executor using std::process::Command
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, command: &str, args: &[&str], working_dir: &Path) -> Result<Output> {
        let output = Command::new(command)
            .args(args)
            .current_dir(working_dir)
            .output()
            .with_context(|| format!("Failed to execute '{} {}'", command, args.join(" ")))?;

        Ok(output)
    }
}

/// Mock command executor for testing
#[cfg(test)]
pub struct MockCommandExecutor {
    /// Pre-configured outputs for commands
    outputs: std::sync::Mutex<Vec<MockCommandResult>>,
    /// Every invocation as "command arg1 arg2 ..."
    calls: std::sync::Mutex<Vec<String>>,
    /// Callbacks run when an invocation line starts with the given prefix
    side_effects: std::sync::Mutex<Vec<(String, SideEffect)>>,
}

#[cfg(test)]
type SideEffect = Box<dyn Fn(&Path) + Send + Sync>;

#[cfg(test)]
#[derive(Clone, Debug)]
pub struct MockCommandResult {
    /// Matched against the start of the invocation line
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[cfg(test)]
impl MockCommandExecutor {
    pub fn new() -> Self {
        Self {
            outputs: std::sync::Mutex::new(Vec::new()),
            calls: std::sync::Mutex::new(Vec::new()),
            side_effects: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_outputs(outputs: Vec<MockCommandResult>) -> Self {
        let executor = Self::new();
        *executor.outputs.lock().unwrap() = outputs;
        executor
    }

    pub fn add_output(&self, output: MockCommandResult) {
        let mut outputs = self.outputs.lock().unwrap();
        outputs.push(output);
    }

    /// Run `effect` with the working directory whenever a matching command executes
    pub fn on_command(&self, prefix: &str, effect: impl Fn(&Path) + Send + Sync + 'static) {
        self.side_effects
            .lock()
            .unwrap()
            .push((prefix.to_string(), Box::new(effect)));
    }

    /// Invocation lines recorded so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Default for MockCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl CommandExecutor for MockCommandExecutor {
    fn execute(&self, command: &str, args: &[&str], working_dir: &Path) -> Result<Output> {
        let line = std::iter::once(command)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());

        for (prefix, effect) in self.side_effects.lock().unwrap().iter() {
            if line.starts_with(prefix.as_str()) {
                effect(working_dir);
            }
        }

        let mut outputs = self.outputs.lock().unwrap();

        if let Some(result) = outputs.iter().position(|r| line.starts_with(r.command.as_str())) {
            let mock_result = outputs.remove(result);
            return Ok(Output {
                status: create_exit_status(mock_result.exit_code),
                stdout: mock_result.stdout.into_bytes(),
                stderr: mock_result.stderr.into_bytes(),
            });
        }

        // Default: successful empty output
        Ok(Output {
            status: create_exit_status(0),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

#[cfg(test)]
fn create_exit_status(code: i32) -> std::process::ExitStatus {
    // ExitStatus can't be constructed directly
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status keeps the exit code in the second byte
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_mock_executor_returns_configured_output() {
        let executor = MockCommandExecutor::with_outputs(vec![MockCommandResult {
            command: "terraform init".to_string(),
            exit_code: 0,
            stdout: "success".to_string(),
            stderr: String::new(),
        }]);

        let output = executor
            .execute("terraform", &["init"], &PathBuf::from("."))
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "success");
    }

    #[test]
    fn test_mock_executor_default_success() {
        let executor = MockCommandExecutor::new();
        let output = executor.execute("unknown", &[], &PathBuf::from(".")).unwrap();
        assert!(output.status.success());
    }

    #[test]
    fn test_mock_executor_exit_code() {
        let executor = MockCommandExecutor::with_outputs(vec![MockCommandResult {
            command: "terraform plan".to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: "Error".to_string(),
        }]);

        let output = executor
            .execute("terraform", &["plan"], &PathBuf::from("."))
            .unwrap();
        assert!(!output.status.success());
        assert_eq!(output.status.code(), Some(1));
    }

    #[test]
    fn test_mock_executor_records_calls_and_side_effects() {
        let executor = MockCommandExecutor::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        executor.on_command("terraform plan", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        executor
            .execute("terraform", &["-chdir=/repo", "init"], &PathBuf::from("."))
            .unwrap();
        executor
            .execute("terraform", &["plan"], &PathBuf::from("."))
            .unwrap();

        assert_eq!(
            executor.calls(),
            vec!["terraform -chdir=/repo init", "terraform plan"]
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
