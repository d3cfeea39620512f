use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::error::{CleanupError, CleanupResult};
use super::global::GlobalRedactor;
use super::multiline::MultilineEraser;
use super::rules::CompiledRules;
use super::tracker::BlockTracker;
use crate::traits::FileSystem;

/// What a cleanup run changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub path: Option<PathBuf>,
    pub global_removed: usize,
    pub block_removed: usize,
    pub substituted: usize,
    pub kept_by_override: usize,
    pub multiline_removed: usize,
    pub resource_blocks: Vec<String>,
    /// Follow-ups the operator must handle before applying, e.g. placeholder credentials
    pub warnings: Vec<String>,
}

impl CleanupReport {
    pub fn lines_removed(&self) -> usize {
        self.global_removed + self.block_removed
    }

    pub fn is_unchanged(&self) -> bool {
        self.lines_removed() == 0 && self.substituted == 0 && self.multiline_removed == 0
    }
}

/// Runs the three cleanup passes over generated configuration
///
/// Order is fixed: global redaction, per-resource block rules, then multiline
/// erasure. Each pass reads the file, rewrites it and writes it back before
/// the next one starts.
pub struct ConfigCleaner {
    rules: Arc<CompiledRules>,
    fs: Arc<dyn FileSystem>,
}

impl ConfigCleaner {
    pub fn new(rules: Arc<CompiledRules>, fs: Arc<dyn FileSystem>) -> Self {
        Self { rules, fs }
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    /// Clean a generated configuration file in place
    pub fn clean(&self, path: &Path) -> CleanupResult<CleanupReport> {
        let mut report = CleanupReport {
            path: Some(path.to_path_buf()),
            ..Default::default()
        };

        self.run_pass(path, |content| self.global_pass(content, &mut report))?;
        self.run_pass(path, |content| self.block_pass(content, &mut report))?;
        self.run_pass(path, |content| self.multiline_pass(content, &mut report))?;

        info!(
            path = %path.display(),
            removed = report.lines_removed(),
            substituted = report.substituted,
            spans = report.multiline_removed,
            "Generated configuration cleaned"
        );

        Ok(report)
    }

    /// Run the same pipeline on in-memory content
    pub fn clean_str(&self, content: &str) -> (String, CleanupReport) {
        let mut report = CleanupReport::default();

        let content = self.global_pass(content, &mut report);
        let content = self.block_pass(&content, &mut report);
        let content = self.multiline_pass(&content, &mut report);

        (content, report)
    }

    fn global_pass(&self, content: &str, report: &mut CleanupReport) -> String {
        let (output, removed) = GlobalRedactor::new(&self.rules.global).redact(content);
        report.global_removed = removed;
        output
    }

    fn block_pass(&self, content: &str, report: &mut CleanupReport) -> String {
        let (output, stats) = BlockTracker::new(&self.rules).process(content);
        report.block_removed = stats.removed;
        report.substituted = stats.substituted;
        report.kept_by_override = stats.kept_by_override;
        report.resource_blocks = stats.resource_blocks;
        report.warnings = stats.warnings;
        output
    }

    fn multiline_pass(&self, content: &str, report: &mut CleanupReport) -> String {
        let (output, removed) = MultilineEraser::new(&self.rules.multiline).erase(content);
        report.multiline_removed = removed;
        output
    }

    fn run_pass<F>(&self, path: &Path, pass: F) -> CleanupResult<()>
    where
        F: FnOnce(&str) -> String,
    {
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| filesystem_error(path, e))?;

        let rewritten = pass(&content);

        self.fs
            .write(path, &rewritten)
            .map_err(|e| filesystem_error(path, e))
    }
}

fn filesystem_error(path: &Path, err: anyhow::Error) -> CleanupError {
    CleanupError::FileSystem {
        path: path.to_path_buf(),
        message: format!("{:#}", err),
    }
}
