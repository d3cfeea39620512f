use std::path::{Path, PathBuf};
use std::process::Output as ProcessOutput;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cleanup::{CleanupReport, ConfigCleaner};
use crate::config::ProjectConfig;
use crate::executor::Executor;
use crate::infrastructure::discovery::{ResourceDescriptor, ResourceDiscovery, ResourceKind};
use crate::infrastructure::error::{ImportError, ImportResult};
use crate::template::ImportTemplates;
use crate::traits::{FileSystem, Output};

/// Suffix parking import files while later resources are planned
const IMPORTED_SUFFIX: &str = ".imported";

/// Options for the import workflow
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub subscription_id: String,
    /// Name matched against `skip_resources`; the subscription ID when unknown
    pub subscription_name: String,
    /// Repository receiving the imported configuration
    pub repo_path: PathBuf,
    pub region: Option<String>,
    /// Only render import files
    pub dry_run: bool,
}

/// Result of the import workflow
#[derive(Debug, Default)]
pub struct ImportSummary {
    /// Names of the resources that went through the workflow
    pub resources: Vec<String>,
    pub import_files: Vec<PathBuf>,
    pub reports: Vec<CleanupReport>,
}

impl ImportSummary {
    /// Every operator follow-up raised while cleaning
    pub fn warnings(&self) -> Vec<&str> {
        self.reports
            .iter()
            .flat_map(|report| report.warnings.iter().map(String::as_str))
            .collect()
    }
}

/// Orchestrates the import of one resource kind into a repository
///
/// For every discovered resource an import file is rendered, the executor
/// generates configuration for it and the generated file is cleaned. Import
/// files are parked with an `.imported` suffix while later resources are
/// planned so each plan only generates configuration for its own resource.
pub struct ImportWorkflow<'a> {
    options: ImportOptions,
    settings: &'a ProjectConfig,
    discovery: &'a dyn ResourceDiscovery,
    executor: Arc<dyn Executor>,
    cleaner: &'a ConfigCleaner,
    templates: ImportTemplates,
    fs: Arc<dyn FileSystem>,
    output: &'a dyn Output,
}

impl<'a> ImportWorkflow<'a> {
    /// Create a new import workflow
    pub fn new(
        options: ImportOptions,
        settings: &'a ProjectConfig,
        discovery: &'a dyn ResourceDiscovery,
        executor: Arc<dyn Executor>,
        cleaner: &'a ConfigCleaner,
        fs: Arc<dyn FileSystem>,
        output: &'a dyn Output,
    ) -> ImportResult<Self> {
        Ok(Self {
            options,
            settings,
            discovery,
            executor,
            cleaner,
            templates: ImportTemplates::new()?,
            fs,
            output,
        })
    }

    /// Import every resource of `kind`
    ///
    /// Parked import files are restored even when a resource fails, before
    /// the error is returned.
    pub fn run(&self, kind: ResourceKind) -> ImportResult<ImportSummary> {
        if self
            .settings
            .is_skipped(&self.options.subscription_name, kind)
        {
            return Err(ImportError::SkippedBySettings {
                subscription: self.options.subscription_name.clone(),
                resource_kind: kind.to_string(),
            });
        }

        self.output
            .section(&format!("Importing {}s", kind.display_name()));

        if self.options.dry_run {
            return self.render_only(kind);
        }

        self.prepare()?;

        let descriptors = self.discovery.discover(kind)?;
        if descriptors.is_empty() {
            self.output.success(&format!(
                "No {} found: nothing to do",
                kind.display_name()
            ));
            return Ok(ImportSummary::default());
        }

        self.output.info(&format!(
            "Found {} {}(s) to import",
            descriptors.len(),
            kind.display_name()
        ));

        let mut summary = ImportSummary::default();
        for descriptor in &descriptors {
            let report = match self.import_one(descriptor) {
                Ok(report) => report,
                Err(e) => {
                    // Leave no import file parked behind
                    if let Err(restore) = self.restore_import_files() {
                        warn!(error = %restore, "Failed to restore parked import files");
                    }
                    return Err(e);
                }
            };
            summary.resources.push(descriptor.name.clone());
            summary
                .import_files
                .push(self.options.repo_path.join(descriptor.import_file_name()));
            summary.reports.push(report);
        }

        self.restore_import_files()?;
        self.finish();

        self.output.blank();
        self.output.success(&format!(
            "Imported {} {}(s)",
            summary.resources.len(),
            kind.display_name()
        ));

        let warnings = summary.warnings();
        if !warnings.is_empty() {
            self.output.warning(&format!(
                "{} value(s) need attention before applying, see the warnings above",
                warnings.len()
            ));
        }

        Ok(summary)
    }

    fn render_only(&self, kind: ResourceKind) -> ImportResult<ImportSummary> {
        let mut summary = ImportSummary::default();

        for descriptor in self.discovery.discover(kind)? {
            let path = self.write_import_file(&descriptor)?;
            self.output
                .success(&format!("Rendered {}", path.display()));
            summary.resources.push(descriptor.name.clone());
            summary.import_files.push(path);
        }

        if summary.resources.is_empty() {
            self.output.success(&format!(
                "No {} found: nothing to do",
                kind.display_name()
            ));
        }

        Ok(summary)
    }

    /// Write `providers.tf` if missing and initialise the working directory
    fn prepare(&self) -> ImportResult<()> {
        let region = self
            .options
            .region
            .as_deref()
            .or(self.settings.provider.region.as_deref());

        if self.templates.write_providers_if_missing(
            self.fs.as_ref(),
            &self.options.repo_path,
            self.settings.provider.subscription_id.as_deref(),
            region,
        )? {
            self.output.success("Created providers.tf");
        }

        self.output
            .info(&format!("Running {} init...", self.executor.binary()));
        let output = self
            .executor
            .init(&self.options.repo_path)
            .map_err(|e| self.spawn_failed("init", e))?;
        self.echo(&output);

        if !output.status.success() {
            return Err(self.command_failed("init", &output));
        }

        Ok(())
    }

    fn import_one(&self, descriptor: &ResourceDescriptor) -> ImportResult<CleanupReport> {
        self.output.subsection(&descriptor.name);
        self.output.key_value("ID", &descriptor.id);

        let import_path = self.write_import_file(descriptor)?;

        let generated_name = descriptor.generated_file_name();
        let generated_path = self.options.repo_path.join(&generated_name);

        let output = self
            .executor
            .plan_generate_config(&self.options.repo_path, &generated_name)
            .map_err(|e| self.spawn_failed("plan", e))?;
        self.echo(&output);

        if !self.fs.exists(&generated_path) {
            return Err(ImportError::MissingGeneratedFile(generated_path));
        }

        if !output.status.success() {
            // Generated configuration that fails validation is what cleanup fixes
            warn!(
                resource = %descriptor.name,
                exit_code = ?output.status.code(),
                "Plan failed after generating configuration"
            );
            self.output.warning(&format!(
                "{} plan reported errors for {}; cleaning the generated configuration anyway",
                self.executor.binary(),
                descriptor.name
            ));
        }

        self.park(&import_path)?;

        let report = self.cleaner.clean(&generated_path)?;
        self.print_report(&report);

        Ok(report)
    }

    fn write_import_file(&self, descriptor: &ResourceDescriptor) -> ImportResult<PathBuf> {
        let rendered = self
            .templates
            .render_import(descriptor, &self.options.subscription_id)?;
        let path = self.options.repo_path.join(descriptor.import_file_name());

        self.fs
            .write(&path, &rendered)
            .map_err(|e| ImportError::FileSystem(format!("{:#}", e)))?;
        info!(path = %path.display(), "Wrote import blocks");

        Ok(path)
    }

    fn park(&self, import_path: &Path) -> ImportResult<()> {
        let mut parked = import_path.as_os_str().to_owned();
        parked.push(IMPORTED_SUFFIX);

        self.fs
            .rename(import_path, Path::new(&parked))
            .map_err(|e| ImportError::FileSystem(format!("{:#}", e)))
    }

    /// Strip the `.imported` suffix from every parked file in the repository
    fn restore_import_files(&self) -> ImportResult<()> {
        let entries = self
            .fs
            .read_dir(&self.options.repo_path)
            .map_err(|e| ImportError::FileSystem(format!("{:#}", e)))?;

        for entry in entries {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(original) = name.strip_suffix(IMPORTED_SUFFIX) else {
                continue;
            };
            if !self.fs.is_file(&entry) {
                continue;
            }

            self.fs
                .rename(&entry, &entry.with_file_name(original))
                .map_err(|e| ImportError::FileSystem(format!("{:#}", e)))?;
        }

        Ok(())
    }

    /// Format and plan the whole repository; failures here are reported only
    fn finish(&self) {
        let binary = self.executor.binary().to_string();

        self.output.info(&format!("Running {} fmt...", binary));
        match self.executor.fmt(&self.options.repo_path) {
            Ok(output) if output.status.success() => self.echo(&output),
            Ok(output) => {
                self.echo(&output);
                self.output
                    .warning(&format!("{} fmt failed", binary));
            }
            Err(e) => self.output.warning(&format!("{} fmt failed: {:#}", binary, e)),
        }

        self.output.info(&format!("Running {} plan...", binary));
        match self.executor.plan(&self.options.repo_path) {
            Ok(output) if output.status.success() => self.echo(&output),
            Ok(output) => {
                self.echo(&output);
                self.output.warning(&format!(
                    "{} plan failed; review the generated configuration",
                    binary
                ));
            }
            Err(e) => self.output.warning(&format!("{} plan failed: {:#}", binary, e)),
        }
    }

    fn print_report(&self, report: &CleanupReport) {
        if let Some(path) = &report.path {
            self.output.key_value("Generated", &path.display().to_string());
        }
        self.output
            .key_value("Lines removed", &report.lines_removed().to_string());
        self.output
            .key_value("Values substituted", &report.substituted.to_string());
        self.output
            .key_value("Empty blocks removed", &report.multiline_removed.to_string());

        for warning in &report.warnings {
            self.output.warning(warning);
        }
    }

    fn echo(&self, output: &ProcessOutput) {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stdout.trim().is_empty() {
            self.output.info(stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            self.output.dimmed(stderr.trim_end());
        }
    }

    fn command_failed(&self, command: &str, output: &ProcessOutput) -> ImportError {
        ImportError::ExecutorFailed {
            command: format!("{} {}", self.executor.binary(), command),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        }
    }

    fn spawn_failed(&self, command: &str, err: anyhow::Error) -> ImportError {
        ImportError::ExecutorFailed {
            command: format!("{} {}", self.executor.binary(), command),
            message: format!("{:#}", err),
            exit_code: None,
        }
    }
}
