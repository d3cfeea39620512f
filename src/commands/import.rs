use anyhow::{Context as _, Result};
use clap::{ArgAction, Args};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cleanup::ConfigCleaner;
use crate::commands::rules::resolve_rules;
use crate::config::ProjectConfig;
use crate::context::Context;
use crate::infrastructure::{ImportOptions, ImportWorkflow, InventoryDiscovery, ResourceKind};

/// Default inventory file looked up in the repository
const DEFAULT_INVENTORY: &str = "inventory.yaml";

/// Import existing Azure resources into a Terraform repository
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Azure subscription ID
    #[arg(long)]
    subscription_id: String,

    /// Repository receiving the generated configuration
    #[arg(long)]
    local_repo_path: PathBuf,

    /// Resource kind: aks, vms, lb, lbgw, storage, sql, mysql, postgresql
    #[arg(long)]
    resource: String,

    /// Region written into providers.tf
    #[arg(long)]
    region: Option<String>,

    /// Inventory export (JSON or YAML), defaults to <local-repo-path>/inventory.yaml
    #[arg(long, env = "TFIMPORT_INVENTORY")]
    inventory: Option<PathBuf>,

    /// Only import resources carrying this tag, e.g. --tag env prod (repeatable)
    #[arg(long = "tag", num_args = 2, value_names = ["KEY", "VALUE"], action = ArgAction::Append)]
    tags: Vec<String>,

    /// Subscription name matched against skip_resources, defaults to the ID
    #[arg(long)]
    subscription_name: Option<String>,

    /// Rule table to use instead of the built-in one
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Executor to run: terraform or opentofu
    #[arg(long)]
    executor: Option<String>,

    /// Only render the import files
    #[arg(long)]
    dry_run: bool,
}

impl ImportCommand {
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let kind: ResourceKind = self.resource.parse()?;
        let repo_path = self.local_repo_path.clone();

        if !ctx.fs.exists(&repo_path) {
            anyhow::bail!("Repository path does not exist: {}", repo_path.display());
        }

        let settings = ProjectConfig::load(ctx.fs.as_ref(), &repo_path)
            .context("Failed to load .tfimport.yaml")?;

        let rules_path = self
            .rules
            .clone()
            .or_else(|| settings.rules_file.as_ref().map(|p| resolve_in(&repo_path, p)));
        let rules = resolve_rules(ctx, rules_path.as_deref())?;

        let executor_name = self.executor.as_deref().unwrap_or(&settings.executor);
        let executor = ctx.executor_registry.get(executor_name)?;

        if !self.dry_run && !executor.check_installed(&repo_path)? {
            anyhow::bail!(
                "{} is not installed or not on PATH",
                executor.binary()
            );
        }

        let inventory_path = self
            .inventory
            .clone()
            .unwrap_or_else(|| repo_path.join(DEFAULT_INVENTORY));
        let discovery =
            InventoryDiscovery::load(ctx.fs.as_ref(), &inventory_path, &self.subscription_id)
                .with_context(|| {
                    format!("Failed to load inventory: {}", inventory_path.display())
                })?
                .with_tag_filters(self.tag_filters());

        let cleaner = ConfigCleaner::new(Arc::new(rules), Arc::clone(&ctx.fs));

        let options = ImportOptions {
            subscription_name: self
                .subscription_name
                .clone()
                .unwrap_or_else(|| self.subscription_id.clone()),
            subscription_id: self.subscription_id.clone(),
            repo_path,
            region: self.region.clone(),
            dry_run: self.dry_run,
        };

        let workflow = ImportWorkflow::new(
            options,
            &settings,
            &discovery,
            executor,
            &cleaner,
            Arc::clone(&ctx.fs),
            ctx.output.as_ref(),
        )?;
        workflow.run(kind)?;

        Ok(())
    }

    /// `--tag` values come in as a flat list of key, value, key, value...
    fn tag_filters(&self) -> Vec<(String, String)> {
        self.tags
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect()
    }
}

fn resolve_in(repo_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_path.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{FileSystem, MockCommandExecutor, MockCommandResult, MockFileSystem, MockOutput};

    const INVENTORY: &str = r#"
resources:
  - kind: storage
    name: stlogs
    id: /subscriptions/0000/resourceGroups/rg-st/providers/Microsoft.Storage/storageAccounts/stlogs
"#;

    fn command(repo: &str) -> ImportCommand {
        ImportCommand {
            subscription_id: "0000".to_string(),
            local_repo_path: PathBuf::from(repo),
            resource: "storage".to_string(),
            region: None,
            inventory: None,
            tags: Vec::new(),
            subscription_name: None,
            rules: None,
            executor: None,
            dry_run: true,
        }
    }

    fn context(fs: Arc<MockFileSystem>, command: Arc<MockCommandExecutor>) -> Context {
        Context::test_with(fs, Arc::new(MockOutput::new()), command)
    }

    #[test]
    fn test_dry_run_renders_from_default_inventory() {
        let fs = Arc::new(MockFileSystem::new());
        fs.write(Path::new("/repo/inventory.yaml"), INVENTORY).unwrap();
        let executor = Arc::new(MockCommandExecutor::new());

        command("/repo")
            .execute(&context(fs.clone(), executor.clone()))
            .unwrap();

        let rendered = fs
            .get_file_contents(Path::new("/repo/import-stlogs.tf"))
            .unwrap();
        assert!(rendered.contains("azurerm_storage_account.stlogs"));
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn test_unknown_resource_kind_fails() {
        let fs = Arc::new(MockFileSystem::new());
        fs.write(Path::new("/repo/inventory.yaml"), INVENTORY).unwrap();
        let mut cmd = command("/repo");
        cmd.resource = "redis".to_string();

        let err = cmd
            .execute(&context(fs, Arc::new(MockCommandExecutor::new())))
            .unwrap_err();

        assert!(err.to_string().contains("Unsupported resource type 'redis'"));
    }

    #[test]
    fn test_missing_executor_binary_fails_before_discovery() {
        let fs = Arc::new(MockFileSystem::new());
        fs.write(Path::new("/repo/inventory.yaml"), INVENTORY).unwrap();
        let executor = Arc::new(MockCommandExecutor::with_outputs(vec![MockCommandResult {
            command: "tofu version".to_string(),
            exit_code: 127,
            stdout: String::new(),
            stderr: String::new(),
        }]));
        let mut cmd = command("/repo");
        cmd.dry_run = false;
        cmd.executor = Some("opentofu".to_string());

        let err = cmd.execute(&context(fs, executor.clone())).unwrap_err();

        assert!(err.to_string().contains("tofu is not installed"));
        assert_eq!(executor.calls(), vec!["tofu version"]);
    }

    #[test]
    fn test_tag_filters_are_paired() {
        let mut cmd = command("/repo");
        cmd.tags = vec![
            "env".to_string(),
            "prod".to_string(),
            "team".to_string(),
            "core".to_string(),
        ];

        assert_eq!(
            cmd.tag_filters(),
            vec![
                ("env".to_string(), "prod".to_string()),
                ("team".to_string(), "core".to_string())
            ]
        );
    }

    #[test]
    fn test_missing_repo_fails() {
        let fs = Arc::new(MockFileSystem::new());

        let result = command("/nowhere").execute(&context(fs, Arc::new(MockCommandExecutor::new())));

        assert!(result.is_err());
    }
}
