use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use crate::cleanup::{CompiledRules, RuleTable};
use crate::context::Context;

/// Inspect and validate cleanup rule tables
#[derive(Debug, Args)]
pub struct RulesCommand {
    #[command(subcommand)]
    subcommand: RulesSubcommand,
}

#[derive(Debug, Subcommand)]
enum RulesSubcommand {
    /// Print the effective rule table as YAML
    Show {
        /// Rule table to show instead of the built-in one
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Parse and compile a rule table, failing on the first malformed pattern
    Check {
        /// Rule table file
        file: PathBuf,
    },
}

impl RulesCommand {
    pub fn execute(self, ctx: &Context) -> Result<()> {
        match self.subcommand {
            RulesSubcommand::Show { rules } => Self::show(ctx, rules.as_deref()),
            RulesSubcommand::Check { file } => Self::check(ctx, &file),
        }
    }

    fn show(ctx: &Context, rules: Option<&Path>) -> Result<()> {
        let table = load_table(ctx, rules)?;
        // Compiling first so `show` never prints a table that would fail at cleanup time
        table
            .compile()
            .context("Rule table contains an invalid pattern")?;

        print!("{}", table.to_yaml()?);
        Ok(())
    }

    fn check(ctx: &Context, file: &Path) -> Result<()> {
        let table = load_table(ctx, Some(file))?;
        let compiled = table
            .compile()
            .with_context(|| format!("Invalid rule table: {}", file.display()))?;

        ctx.output
            .success(&format!("Rule table is valid: {}", file.display()));
        ctx.output.key_value(
            "Global patterns",
            &compiled.global.patterns.len().to_string(),
        );
        ctx.output.key_value(
            "Global exceptions",
            &compiled.global.exceptions.len().to_string(),
        );
        ctx.output
            .key_value("Multiline patterns", &compiled.multiline.len().to_string());
        ctx.output
            .key_value("Resource types", &compiled.resource_types().join(", "));

        Ok(())
    }
}

fn load_table(ctx: &Context, rules: Option<&Path>) -> Result<RuleTable> {
    match rules {
        Some(path) => RuleTable::load(ctx.fs.as_ref(), path)
            .with_context(|| format!("Failed to load rule table: {}", path.display())),
        None => RuleTable::builtin().context("Built-in rule table is invalid"),
    }
}

/// Compile the rule table at `rules`, or the built-in one
pub(crate) fn resolve_rules(ctx: &Context, rules: Option<&Path>) -> Result<CompiledRules> {
    let table = load_table(ctx, rules)?;
    Ok(table.compile()?)
}
