use anyhow::Result;
use std::path::Path;
use std::process::Output;

/// Trait for Infrastructure as Code executors (Terraform, OpenTofu)
///
/// Every method runs in `working_dir`, the repository receiving the imported
/// configuration, and returns the raw process output so callers decide which
/// failures are fatal.
pub trait Executor: Send + Sync {
    /// Get the name of this executor (e.g., "terraform", "opentofu")
    fn get_name(&self) -> &str;

    /// Binary invoked for every command
    fn binary(&self) -> &str;

    /// Check if the executor is installed and available
    fn check_installed(&self, working_dir: &Path) -> Result<bool>;

    /// Run `init`
    fn init(&self, working_dir: &Path) -> Result<Output>;

    /// Run `plan` with import blocks present, writing the generated
    /// configuration to `out_file` (relative to `working_dir`)
    fn plan_generate_config(&self, working_dir: &Path, out_file: &str) -> Result<Output>;

    /// Run `fmt`
    fn fmt(&self, working_dir: &Path) -> Result<Output>;

    /// Run a plain `plan`
    fn plan(&self, working_dir: &Path) -> Result<Output>;
}
