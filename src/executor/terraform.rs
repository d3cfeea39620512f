use anyhow::Result;
use std::path::Path;
use std::process::Output;
use std::sync::Arc;
use tracing::debug;

use super::executor::Executor;
use crate::traits::CommandExecutor;

/// Executor for the Terraform CLI and its OpenTofu fork
///
/// Both binaries accept the same sub-commands, so one implementation serves
/// both; only the binary name differs.
pub struct TerraformExecutor {
    name: String,
    binary: String,
    command: Arc<dyn CommandExecutor>,
}

impl TerraformExecutor {
    pub fn new(
        name: impl Into<String>,
        binary: impl Into<String>,
        command: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            binary: binary.into(),
            command,
        }
    }

    pub fn terraform(command: Arc<dyn CommandExecutor>) -> Self {
        Self::new("terraform", "terraform", command)
    }

    pub fn opentofu(command: Arc<dyn CommandExecutor>) -> Self {
        Self::new("opentofu", "tofu", command)
    }

    fn run(&self, args: &[&str], working_dir: &Path) -> Result<Output> {
        debug!(
            binary = %self.binary,
            args = %args.join(" "),
            dir = %working_dir.display(),
            "Running executor command"
        );
        self.command.execute(&self.binary, args, working_dir)
    }
}

impl Executor for TerraformExecutor {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    fn check_installed(&self, working_dir: &Path) -> Result<bool> {
        // A missing binary surfaces as a spawn error
        match self.run(&["version"], working_dir) {
            Ok(output) => Ok(output.status.success()),
            Err(_) => Ok(false),
        }
    }

    fn init(&self, working_dir: &Path) -> Result<Output> {
        self.run(&["init", "-input=false", "-no-color"], working_dir)
    }

    fn plan_generate_config(&self, working_dir: &Path, out_file: &str) -> Result<Output> {
        let generate = format!("-generate-config-out={}", out_file);
        self.run(&["plan", &generate, "-input=false", "-no-color"], working_dir)
    }

    fn fmt(&self, working_dir: &Path) -> Result<Output> {
        self.run(&["fmt"], working_dir)
    }

    fn plan(&self, working_dir: &Path) -> Result<Output> {
        self.run(&["plan", "-input=false", "-no-color"], working_dir)
    }
}
