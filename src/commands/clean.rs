use anyhow::{Context as _, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;

use crate::cleanup::{CleanupReport, ConfigCleaner};
use crate::commands::rules::resolve_rules;
use crate::context::Context;

/// Prefix of the files written by `plan -generate-config-out` during an import
const GENERATED_PREFIX: &str = "generated-plan-import-";

const MAX_WALK_DEPTH: usize = 16;

/// Clean generated Terraform configuration files in place
#[derive(Debug, Args)]
pub struct CleanCommand {
    /// Generated configuration files to clean
    files: Vec<PathBuf>,

    /// Also clean every generated-plan-import-*.tf file in this directory
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Descend into subdirectories of --dir
    #[arg(long, short = 'r', requires = "dir")]
    recursive: bool,

    /// Rule table to use instead of the built-in one
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Print the cleanup reports as JSON
    #[arg(long)]
    json: bool,
}

impl CleanCommand {
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let rules = resolve_rules(ctx, self.rules.as_deref())?;
        let targets = self.collect_targets(ctx)?;

        if targets.is_empty() {
            anyhow::bail!("No files to clean: pass file paths or --dir");
        }

        let cleaner = ConfigCleaner::new(Arc::new(rules), Arc::clone(&ctx.fs));
        let mut reports = Vec::new();
        let mut failed = 0;

        for path in &targets {
            match cleaner.clean(path) {
                Ok(report) => {
                    if !self.json {
                        print_report(ctx, &report);
                    }
                    reports.push(report);
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Cleanup failed");
                    ctx.output.error(&e.to_string());
                    failed += 1;
                }
            }
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&reports).context("Failed to serialize reports")?
            );
        }

        if failed > 0 {
            anyhow::bail!("{} of {} file(s) could not be cleaned", failed, targets.len());
        }

        if !self.json {
            ctx.output.blank();
            ctx.output
                .success(&format!("Cleaned {} file(s)", reports.len()));
        }

        Ok(())
    }

    fn collect_targets(&self, ctx: &Context) -> Result<Vec<PathBuf>> {
        let mut targets = self.files.clone();

        if let Some(dir) = &self.dir {
            let entries = if self.recursive {
                ctx.fs.walk_dir(dir, MAX_WALK_DEPTH)
            } else {
                ctx.fs.read_dir(dir)
            }
            .with_context(|| format!("Failed to list {}", dir.display()))?;
            targets.extend(
                entries
                    .into_iter()
                    .filter(|path| is_generated_file(path) && ctx.fs.is_file(path)),
            );
        }

        Ok(targets)
    }
}

fn is_generated_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(GENERATED_PREFIX) && name.ends_with(".tf"))
}

fn print_report(ctx: &Context, report: &CleanupReport) {
    let title = report
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    ctx.output.subsection(&title);

    if report.is_unchanged() {
        ctx.output.dimmed("  Nothing to clean");
    } else {
        ctx.output
            .key_value("Lines removed", &report.lines_removed().to_string());
        ctx.output
            .key_value("Values substituted", &report.substituted.to_string());
        ctx.output
            .key_value("Kept by override", &report.kept_by_override.to_string());
        ctx.output
            .key_value("Empty blocks removed", &report.multiline_removed.to_string());
    }

    for warning in &report.warnings {
        ctx.output.warning(warning);
    }
}
